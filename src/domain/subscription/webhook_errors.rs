//! Webhook error types.
//!
//! Every failure in the webhook pipeline maps to exactly one HTTP response,
//! and the response decides whether the provider redelivers:
//! - 2xx: acknowledged, no retry
//! - 4xx: rejected, no retry
//! - 5xx: retry on the provider's schedule

use axum::http::StatusCode;
use thiserror::Error;

use super::Provider;

/// Broad error classes, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authentication,
    Malformed,
    PayloadDefect,
    UpstreamTransient,
    Resolution,
    UnknownStatus,
    Ignored,
    Storage,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Authentication => "authentication",
            ErrorClass::Malformed => "malformed",
            ErrorClass::PayloadDefect => "payload_defect",
            ErrorClass::UpstreamTransient => "upstream_transient",
            ErrorClass::Resolution => "resolution",
            ErrorClass::UnknownStatus => "unknown_status",
            ErrorClass::Ignored => "ignored",
            ErrorClass::Storage => "storage",
        }
    }
}

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing, unparsable, or not matching the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Body could not be decoded at all.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Decodable payload lacking a field needed to correlate it.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Follow-up read against the provider API failed.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No account is mapped to the provider customer.
    #[error("No account mapped to {provider} customer {customer_id}")]
    NoMatchingAccount {
        provider: Provider,
        customer_id: String,
    },

    /// Native status missing from the provider's mapping table.
    #[error("Unknown {provider} status '{status}'")]
    UnknownStatus { provider: Provider, status: String },

    /// Event intentionally not processed.
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Subscription store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => ErrorClass::Authentication,
            WebhookError::MalformedPayload(_) => ErrorClass::Malformed,
            WebhookError::MissingField(_) => ErrorClass::PayloadDefect,
            WebhookError::UpstreamUnavailable(_) => ErrorClass::UpstreamTransient,
            WebhookError::NoMatchingAccount { .. } => ErrorClass::Resolution,
            WebhookError::UnknownStatus { .. } => ErrorClass::UnknownStatus,
            WebhookError::Ignored(_) => ErrorClass::Ignored,
            WebhookError::Storage(_) => ErrorClass::Storage,
        }
    }

    /// Returns true if the provider should redeliver this event.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::UpstreamUnavailable(_) | WebhookError::Storage(_)
        )
    }

    /// Returns true if the delivery is acknowledged with a 2xx.
    pub fn is_acknowledged(&self) -> bool {
        self.status_code().is_success()
    }

    /// Maps the error to the HTTP status returned to the provider.
    pub fn status_code(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
            ErrorClass::Malformed => StatusCode::BAD_REQUEST,

            // Retrying cannot repair these, so acknowledge them
            ErrorClass::PayloadDefect
            | ErrorClass::Resolution
            | ErrorClass::UnknownStatus
            | ErrorClass::Ignored => StatusCode::OK,

            ErrorClass::UpstreamTransient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            WebhookError::NoMatchingAccount { .. } => "NO_MATCHING_ACCOUNT",
            WebhookError::UnknownStatus { .. } => "UNKNOWN_STATUS",
            WebhookError::Ignored(_) => "IGNORED",
            WebhookError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authentication_failures_return_unauthorized() {
        for err in [
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn malformed_payload_returns_bad_request() {
        let err = WebhookError::MalformedPayload("expected value at line 1".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_acknowledged());
    }

    #[test]
    fn missing_field_is_acknowledged() {
        let err = WebhookError::MissingField("customer");
        assert_eq!(err.status_code(), StatusCode::OK);
        assert!(!err.is_retryable());
    }

    #[test]
    fn no_matching_account_is_acknowledged() {
        let err = WebhookError::NoMatchingAccount {
            provider: Provider::Stripe,
            customer_id: "cus_404".to_string(),
        };
        assert!(err.is_acknowledged());
        assert!(!err.is_retryable());
        assert_eq!(err.class(), ErrorClass::Resolution);
    }

    #[test]
    fn unknown_status_is_acknowledged() {
        let err = WebhookError::UnknownStatus {
            provider: Provider::MercadoPago,
            status: "suspended".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    #[test]
    fn ignored_returns_ok() {
        let err = WebhookError::Ignored("event type not handled".to_string());
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    #[test]
    fn upstream_unavailable_requests_retry() {
        let err = WebhookError::UpstreamUnavailable("timed out".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_retryable());
    }

    #[test]
    fn storage_error_requests_retry() {
        let err = WebhookError::Storage("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn retryable_iff_server_error() {
        let all = vec![
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
            WebhookError::MalformedPayload(String::new()),
            WebhookError::MissingField("x"),
            WebhookError::UpstreamUnavailable(String::new()),
            WebhookError::NoMatchingAccount {
                provider: Provider::Stripe,
                customer_id: String::new(),
            },
            WebhookError::UnknownStatus {
                provider: Provider::Stripe,
                status: String::new(),
            },
            WebhookError::Ignored(String::new()),
            WebhookError::Storage(String::new()),
        ];
        for err in all {
            assert_eq!(err.is_retryable(), err.status_code().is_server_error(), "{:?}", err);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn no_matching_account_displays_customer() {
        let err = WebhookError::NoMatchingAccount {
            provider: Provider::MercadoPago,
            customer_id: "123456".to_string(),
        };
        assert_eq!(err.to_string(), "No account mapped to mercadopago customer 123456");
    }

    #[test]
    fn unknown_status_displays_native_value() {
        let err = WebhookError::UnknownStatus {
            provider: Provider::Stripe,
            status: "frozen".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown stripe status 'frozen'");
    }
}

//! Billing provider port.
//!
//! Outbound calls against a payment provider's REST API: customer creation
//! for provisioning, customer listing for reconciliation, and subscription
//! detail reads for providers whose notifications carry only an id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AccountId, ProviderCustomerId, Timestamp};
use crate::domain::subscription::Provider;

/// Request to create a customer at a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    pub account_id: AccountId,
    pub email: String,
    pub name: Option<String>,
}

/// A customer as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderCustomer {
    pub id: ProviderCustomerId,
    pub email: Option<String>,
    /// Account id the customer was tagged with at creation, if any.
    pub account_reference: Option<String>,
}

/// Full subscription detail fetched from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDetail {
    pub id: String,
    pub status: String,
    pub customer_id: Option<String>,
    pub account_reference: Option<String>,
    pub last_modified: Option<Timestamp>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Creates a customer tagged with the account id.
    async fn create_customer(
        &self,
        request: &CreateCustomerRequest,
    ) -> Result<ProviderCustomer, PaymentError>;

    /// Lists every customer at the provider, following pagination.
    async fn list_customers(&self) -> Result<Vec<ProviderCustomer>, PaymentError>;
}

/// Read access to subscription detail by provider subscription id.
#[async_trait]
pub trait SubscriptionDetailSource: Send + Sync {
    async fn fetch_subscription(&self, subscription_id: &str)
        -> Result<SubscriptionDetail, PaymentError>;
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code or HTTP status (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }

    /// Classifies a non-success HTTP status from a provider API.
    pub fn from_status(status: u16, body: &str) -> Self {
        let code = match status {
            401 | 403 => PaymentErrorCode::AuthenticationError,
            404 => PaymentErrorCode::NotFound,
            429 => PaymentErrorCode::RateLimitExceeded,
            500..=599 => PaymentErrorCode::ProviderError,
            _ => PaymentErrorCode::InvalidRequest,
        };
        Self::new(code, truncate(body, 200)).with_provider_code(status.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    Timeout,
    AuthenticationError,
    RateLimitExceeded,
    ProviderError,
    NotFound,
    InvalidRequest,
    InvalidResponse,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

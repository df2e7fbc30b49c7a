//! Data Transfer Objects for subscription HTTP endpoints.
//!
//! Request bodies deserialize from JSON; responses serialize to JSON.

use serde::{Deserialize, Serialize};

use crate::application::{
    ProvisionAccountResult, ProvisionedCustomer, ReconciliationReport, WebhookReceipt,
};
use crate::domain::subscription::{CanonicalStatus, Provider, UpsertOutcome, WebhookError};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /internal/accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionAccountRequest {
    pub account_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the provider with a 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// `applied`, `unchanged`, `stale`, or the class of an acknowledged error.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CanonicalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<WebhookReceipt> for WebhookAckResponse {
    fn from(receipt: WebhookReceipt) -> Self {
        let outcome = match &receipt.outcome {
            UpsertOutcome::Applied { .. } => "applied",
            UpsertOutcome::Unchanged { .. } => "unchanged",
            UpsertOutcome::Stale { .. } => "stale",
        };
        Self {
            received: true,
            outcome: outcome.to_string(),
            account_id: Some(receipt.outcome.account_id().to_string()),
            status: Some(receipt.outcome.current()),
            detail: None,
        }
    }
}

impl WebhookAckResponse {
    /// Acknowledgement for an error the provider must not retry.
    pub fn for_error(err: &WebhookError) -> Self {
        Self {
            received: true,
            outcome: err.class().as_str().to_string(),
            account_id: None,
            status: None,
            detail: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionAccountResponse {
    pub account_id: String,
    pub status: CanonicalStatus,
    pub provider: Provider,
    pub customers: Vec<ProvisionedCustomer>,
}

impl From<ProvisionAccountResult> for ProvisionAccountResponse {
    fn from(result: ProvisionAccountResult) -> Self {
        Self {
            account_id: result.record.account_id.to_string(),
            status: result.record.canonical_status,
            provider: result.record.provider,
            customers: result.customers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResponse {
    pub reports: Vec<ReconciliationReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

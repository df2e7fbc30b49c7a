//! Canonical subscription status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Canonical subscription status, independent of any provider vocabulary.
///
/// Variants are declared in severity order:
/// `pending_payment < active < payment_failed | unpaid < paused < canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    /// Provisioned, no successful payment yet.
    PendingPayment,

    /// Paid and in good standing.
    Active,

    /// A charge failed; the provider may still retry it.
    PaymentFailed,

    /// Payment retries exhausted or invoice left unpaid.
    Unpaid,

    /// Billing paused by the customer or the provider.
    Paused,

    /// Subscription ended.
    #[serde(alias = "cancelled")]
    Canceled,
}

impl CanonicalStatus {
    /// All canonical statuses, in severity order.
    pub const ALL: [CanonicalStatus; 6] = [
        CanonicalStatus::PendingPayment,
        CanonicalStatus::Active,
        CanonicalStatus::PaymentFailed,
        CanonicalStatus::Unpaid,
        CanonicalStatus::Paused,
        CanonicalStatus::Canceled,
    ];

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::PendingPayment => "pending_payment",
            CanonicalStatus::Active => "active",
            CanonicalStatus::PaymentFailed => "payment_failed",
            CanonicalStatus::Unpaid => "unpaid",
            CanonicalStatus::Paused => "paused",
            CanonicalStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(CanonicalStatus::PendingPayment),
            "active" => Ok(CanonicalStatus::Active),
            "payment_failed" => Ok(CanonicalStatus::PaymentFailed),
            "unpaid" => Ok(CanonicalStatus::Unpaid),
            "paused" => Ok(CanonicalStatus::Paused),
            "canceled" | "cancelled" => Ok(CanonicalStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "canonical_status",
                format!("unrecognized status '{}'", other),
            )),
        }
    }
}

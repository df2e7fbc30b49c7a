//! Access gate.
//!
//! Pure translation from stored subscription status to an access decision.
//! Anything other than an `active` status denies, including values that
//! cannot be recognized.

use serde::Serialize;

use super::CanonicalStatus;

/// Returns true only for [`CanonicalStatus::Active`].
pub fn is_active(status: CanonicalStatus) -> bool {
    status == CanonicalStatus::Active
}

/// Where a denied caller should be sent to resolve billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingAction {
    /// Start (or restart) a subscription.
    Subscribe,
    /// Settle an outstanding or paused payment.
    RegularizePayment,
}

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    NoSubscription,
    Status { status: CanonicalStatus },
    UnrecognizedStatus { raw: String },
    StatusUnavailable,
}

/// Result of evaluating the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Granted,
    Denied {
        #[serde(flatten)]
        reason: DenialReason,
        action: BillingAction,
    },
}

impl AccessDecision {
    /// Evaluates a known status (or its absence).
    pub fn for_status(status: Option<CanonicalStatus>) -> Self {
        match status {
            Some(s) if is_active(s) => AccessDecision::Granted,
            Some(s) => AccessDecision::Denied {
                reason: DenialReason::Status { status: s },
                action: action_for(s),
            },
            None => AccessDecision::Denied {
                reason: DenialReason::NoSubscription,
                action: BillingAction::Subscribe,
            },
        }
    }

    /// Evaluates a raw stored value. Unrecognized values deny.
    pub fn for_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Self::for_status(None),
            Some(value) => match value.parse::<CanonicalStatus>() {
                Ok(status) => Self::for_status(Some(status)),
                Err(_) => AccessDecision::Denied {
                    reason: DenialReason::UnrecognizedStatus {
                        raw: value.to_string(),
                    },
                    action: BillingAction::RegularizePayment,
                },
            },
        }
    }

    /// Denial used when the status could not be read at all.
    pub fn unavailable() -> Self {
        AccessDecision::Denied {
            reason: DenialReason::StatusUnavailable,
            action: BillingAction::RegularizePayment,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    pub fn action(&self) -> Option<BillingAction> {
        match self {
            AccessDecision::Granted => None,
            AccessDecision::Denied { action, .. } => Some(*action),
        }
    }
}

fn action_for(status: CanonicalStatus) -> BillingAction {
    match status {
        CanonicalStatus::PaymentFailed | CanonicalStatus::Unpaid | CanonicalStatus::Paused => {
            BillingAction::RegularizePayment
        }
        CanonicalStatus::PendingPayment | CanonicalStatus::Canceled | CanonicalStatus::Active => {
            BillingAction::Subscribe
        }
    }
}

//! Subscription record and the write model used to mutate it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, ProviderCustomerId, Timestamp};

use super::{CanonicalStatus, Provider};

/// Durable per-account subscription state.
///
/// Exactly one record exists per account. Records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub account_id: AccountId,
    pub canonical_status: CanonicalStatus,
    /// Provider that last wrote this record.
    pub provider: Provider,
    pub provider_customer_id: ProviderCustomerId,
    pub provider_subscription_id: Option<String>,
    pub updated_at: Timestamp,
    /// Provider-side time of the last applied event, when known.
    pub last_event_at: Option<Timestamp>,
}

impl SubscriptionRecord {
    /// Builds the initial record written at provisioning.
    pub fn pending(
        account_id: AccountId,
        provider: Provider,
        provider_customer_id: ProviderCustomerId,
    ) -> Self {
        Self {
            account_id,
            canonical_status: CanonicalStatus::PendingPayment,
            provider,
            provider_customer_id,
            provider_subscription_id: None,
            updated_at: Timestamp::now(),
            last_event_at: None,
        }
    }

    /// Returns true if an update timestamped `occurred_at` predates the
    /// last applied event. Unknown timestamps are never stale.
    pub fn is_stale(&self, occurred_at: Option<Timestamp>) -> bool {
        match (self.last_event_at, occurred_at) {
            (Some(stored), Some(incoming)) => incoming.is_before(&stored),
            _ => false,
        }
    }

    /// Applies a normalized update in place.
    pub fn apply(&mut self, update: &StatusUpdate) {
        self.canonical_status = update.status;
        self.provider = update.provider;
        self.provider_customer_id = update.provider_customer_id.clone();
        if let Some(sub_id) = &update.provider_subscription_id {
            self.provider_subscription_id = Some(sub_id.clone());
        }
        if update.occurred_at.is_some() {
            self.last_event_at = update.occurred_at;
        }
        self.updated_at = Timestamp::now();
    }
}

/// A normalized status write, keyed by provider customer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub provider: Provider,
    pub provider_customer_id: ProviderCustomerId,
    pub status: CanonicalStatus,
    pub provider_subscription_id: Option<String>,
    /// Account named by the event itself, used to link an unmapped customer.
    pub account_hint: Option<AccountId>,
    pub occurred_at: Option<Timestamp>,
}

impl StatusUpdate {
    /// Builds a record for an account that has no row yet.
    pub fn into_record(&self, account_id: AccountId) -> SubscriptionRecord {
        SubscriptionRecord {
            account_id,
            canonical_status: self.status,
            provider: self.provider,
            provider_customer_id: self.provider_customer_id.clone(),
            provider_subscription_id: self.provider_subscription_id.clone(),
            updated_at: Timestamp::now(),
            last_event_at: self.occurred_at,
        }
    }
}

/// How concurrent or reordered deliveries are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Every resolved update is written, in arrival order.
    #[default]
    LastWriteWins,
    /// Updates older than the stored `last_event_at` are acknowledged but skipped.
    RejectStale,
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// The status changed (or the record was created).
    Applied {
        account_id: AccountId,
        previous: Option<CanonicalStatus>,
        current: CanonicalStatus,
    },
    /// The record already held this status; metadata may have been refreshed.
    Unchanged {
        account_id: AccountId,
        current: CanonicalStatus,
    },
    /// Skipped under [`WritePolicy::RejectStale`].
    Stale {
        account_id: AccountId,
        current: CanonicalStatus,
    },
}

impl UpsertOutcome {
    /// Classifies a write from the status before and after it.
    pub fn from_transition(
        account_id: AccountId,
        previous: Option<CanonicalStatus>,
        current: CanonicalStatus,
    ) -> Self {
        if previous == Some(current) {
            UpsertOutcome::Unchanged { account_id, current }
        } else {
            UpsertOutcome::Applied {
                account_id,
                previous,
                current,
            }
        }
    }

    pub fn account_id(&self) -> &AccountId {
        match self {
            UpsertOutcome::Applied { account_id, .. }
            | UpsertOutcome::Unchanged { account_id, .. }
            | UpsertOutcome::Stale { account_id, .. } => account_id,
        }
    }

    /// Status stored after the call.
    pub fn current(&self) -> CanonicalStatus {
        match self {
            UpsertOutcome::Applied { current, .. }
            | UpsertOutcome::Unchanged { current, .. }
            | UpsertOutcome::Stale { current, .. } => *current,
        }
    }
}

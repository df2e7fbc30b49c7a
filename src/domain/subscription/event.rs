//! Provider event after authentication and extraction.

use crate::domain::foundation::{AccountId, ProviderCustomerId, Timestamp};

use super::{CanonicalStatus, Provider, StatusUpdate};

/// What a provider adapter extracts from one inbound delivery.
///
/// `provider_native_status` is still in the provider's vocabulary; it becomes
/// canonical only through the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    pub provider: Provider,
    /// Provider-assigned id of the delivery or resource, for log correlation.
    pub event_id: String,
    pub event_type: String,
    pub provider_customer_id: ProviderCustomerId,
    pub provider_native_status: String,
    pub provider_subscription_id: Option<String>,
    pub account_hint: Option<AccountId>,
    pub occurred_at: Option<Timestamp>,
}

impl ProviderEvent {
    /// Pairs the event with its normalized status.
    pub fn into_update(self, status: CanonicalStatus) -> StatusUpdate {
        StatusUpdate {
            provider: self.provider,
            provider_customer_id: self.provider_customer_id,
            status,
            provider_subscription_id: self.provider_subscription_id,
            account_hint: self.account_hint,
            occurred_at: self.occurred_at,
        }
    }
}

//! CheckAccessHandler - Query handler for the access gate.
//!
//! Access is granted only when the stored status is `active`. Every other
//! outcome denies, including a store that cannot be read.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{AccountId, ErrorCode};
use crate::domain::subscription::{AccessDecision, CanonicalStatus};
use crate::ports::SubscriptionStore;

/// Query to check whether an account may use the product.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub account_id: AccountId,
}

/// Result of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckAccessResult {
    pub account_id: AccountId,
    /// Stored status, absent when there is no record or it could not be read.
    #[serde(rename = "subscription_status")]
    pub status: Option<CanonicalStatus>,
    #[serde(flatten)]
    pub decision: AccessDecision,
}

impl CheckAccessResult {
    pub fn allowed(&self) -> bool {
        self.decision.is_granted()
    }
}

pub struct CheckAccessHandler {
    store: Arc<dyn SubscriptionStore>,
}

impl CheckAccessHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Never fails: storage errors produce a denial.
    pub async fn handle(&self, query: CheckAccessQuery) -> CheckAccessResult {
        let account_id = query.account_id;

        let (status, decision) = match self.store.find_by_account(&account_id).await {
            Ok(record) => {
                let status = record.map(|r| r.canonical_status);
                (status, AccessDecision::for_status(status))
            }
            Err(e) if e.is(ErrorCode::UnrecognizedStatus) => {
                tracing::warn!(
                    account_id = %account_id,
                    error = %e,
                    "Stored status not recognized, denying access"
                );
                let raw = e.details.get("status").map(String::as_str).unwrap_or("");
                (None, AccessDecision::for_raw(Some(raw)))
            }
            Err(e) => {
                tracing::error!(
                    account_id = %account_id,
                    error = %e,
                    "Subscription store unavailable, denying access"
                );
                (None, AccessDecision::unavailable())
            }
        };

        CheckAccessResult {
            account_id,
            status,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::domain::foundation::{DomainError, ProviderCustomerId, Timestamp};
    use crate::domain::subscription::{
        BillingAction, DenialReason, Provider, StatusUpdate, SubscriptionRecord, UpsertOutcome,
        WritePolicy,
    };
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Test doubles
    // ════════════════════════════════════════════════════════════════════════════

    struct BrokenStore {
        error: DomainError,
    }

    #[async_trait]
    impl SubscriptionStore for BrokenStore {
        async fn upsert(&self, _: &StatusUpdate, _: WritePolicy) -> Result<UpsertOutcome, DomainError> {
            Err(self.error.clone())
        }
        async fn create_pending(
            &self,
            _: &AccountId,
            _: Provider,
            _: &ProviderCustomerId,
        ) -> Result<SubscriptionRecord, DomainError> {
            Err(self.error.clone())
        }
        async fn find_by_account(&self, _: &AccountId) -> Result<Option<SubscriptionRecord>, DomainError> {
            Err(self.error.clone())
        }
        async fn resolve_customer(
            &self,
            _: Provider,
            _: &ProviderCustomerId,
        ) -> Result<Option<AccountId>, DomainError> {
            Err(self.error.clone())
        }
        async fn link_customer(
            &self,
            _: Provider,
            _: &ProviderCustomerId,
            _: &AccountId,
        ) -> Result<(), DomainError> {
            Err(self.error.clone())
        }
        async fn customer_ids(&self, _: Provider) -> Result<Vec<ProviderCustomerId>, DomainError> {
            Err(self.error.clone())
        }
    }

    async fn store_with_status(status: CanonicalStatus) -> Arc<InMemorySubscriptionStore> {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let account = AccountId::new("acc_1").unwrap();
        let customer = ProviderCustomerId::new("cus_1").unwrap();
        store.link_customer(Provider::Stripe, &customer, &account).await.unwrap();
        store.create_pending(&account, Provider::Stripe, &customer).await.unwrap();
        if status != CanonicalStatus::PendingPayment {
            let update = StatusUpdate {
                provider: Provider::Stripe,
                provider_customer_id: customer,
                status,
                provider_subscription_id: None,
                account_hint: None,
                occurred_at: Some(Timestamp::now()),
            };
            store.upsert(&update, WritePolicy::LastWriteWins).await.unwrap();
        }
        store
    }

    fn query(id: &str) -> CheckAccessQuery {
        CheckAccessQuery {
            account_id: AccountId::new(id).unwrap(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn active_account_is_granted() {
        let handler = CheckAccessHandler::new(store_with_status(CanonicalStatus::Active).await);
        let result = handler.handle(query("acc_1")).await;

        assert!(result.allowed());
        assert_eq!(result.status, Some(CanonicalStatus::Active));
        assert_eq!(result.decision.action(), None);
    }

    #[tokio::test]
    async fn every_other_status_is_denied() {
        for status in CanonicalStatus::ALL {
            if status == CanonicalStatus::Active {
                continue;
            }
            let handler = CheckAccessHandler::new(store_with_status(status).await);
            let result = handler.handle(query("acc_1")).await;
            assert!(!result.allowed(), "{} must not grant access", status);
            assert_eq!(result.status, Some(status));
        }
    }

    #[tokio::test]
    async fn delinquent_statuses_suggest_regularizing_payment() {
        let handler = CheckAccessHandler::new(store_with_status(CanonicalStatus::PaymentFailed).await);
        let result = handler.handle(query("acc_1")).await;
        assert_eq!(result.decision.action(), Some(BillingAction::RegularizePayment));
    }

    #[tokio::test]
    async fn missing_record_is_denied_with_subscribe_action() {
        let handler = CheckAccessHandler::new(Arc::new(InMemorySubscriptionStore::new()));
        let result = handler.handle(query("acc_unknown")).await;

        assert!(!result.allowed());
        assert_eq!(result.status, None);
        assert_eq!(result.decision.action(), Some(BillingAction::Subscribe));
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let handler = CheckAccessHandler::new(Arc::new(BrokenStore {
            error: DomainError::database("pool timed out"),
        }));
        let result = handler.handle(query("acc_1")).await;

        assert!(!result.allowed());
        assert!(matches!(
            result.decision,
            AccessDecision::Denied {
                reason: DenialReason::StatusUnavailable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unrecognized_stored_status_is_denied() {
        let handler = CheckAccessHandler::new(Arc::new(BrokenStore {
            error: DomainError::new(ErrorCode::UnrecognizedStatus, "bad row")
                .with_detail("status", "trialing"),
        }));
        let result = handler.handle(query("acc_1")).await;

        assert!(!result.allowed());
        assert!(matches!(
            result.decision,
            AccessDecision::Denied {
                reason: DenialReason::UnrecognizedStatus { .. },
                ..
            }
        ));
    }
}

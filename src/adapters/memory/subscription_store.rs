//! In-memory subscription store.
//!
//! A single `RwLock` guards records and mappings together, so every
//! operation is atomic. Used by tests and by local runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, ProviderCustomerId};
use crate::domain::subscription::{
    Provider, StatusUpdate, SubscriptionRecord, UpsertOutcome, WritePolicy,
};
use crate::ports::SubscriptionStore;

#[derive(Default)]
struct State {
    records: HashMap<AccountId, SubscriptionRecord>,
    customers: HashMap<(Provider, ProviderCustomerId), AccountId>,
}

impl State {
    fn link(
        &mut self,
        provider: Provider,
        customer: &ProviderCustomerId,
        account: &AccountId,
    ) -> Result<(), DomainError> {
        match self.customers.get(&(provider, customer.clone())) {
            Some(existing) if existing == account => Ok(()),
            Some(existing) => Err(DomainError::new(
                ErrorCode::CustomerMappingConflict,
                format!(
                    "{} customer {} already mapped to account {}",
                    provider, customer, existing
                ),
            )),
            None => {
                self.customers
                    .insert((provider, customer.clone()), account.clone());
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    state: RwLock<State>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, ordered by account id.
    pub async fn records(&self) -> Vec<SubscriptionRecord> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state.records.values().cloned().collect();
        records.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        records
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert(
        &self,
        update: &StatusUpdate,
        policy: WritePolicy,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut state = self.state.write().await;

        let key = (update.provider, update.provider_customer_id.clone());
        let account_id = match (state.customers.get(&key).cloned(), &update.account_hint) {
            (Some(mapped), hint) => {
                if let Some(hint) = hint.as_ref().filter(|h| **h != mapped) {
                    tracing::warn!(
                        provider = %update.provider,
                        customer_id = %update.provider_customer_id,
                        mapped_account = %mapped,
                        hinted_account = %hint,
                        "Account hint disagrees with existing customer mapping; keeping mapping"
                    );
                }
                mapped
            }
            (None, Some(hint)) => {
                state.link(update.provider, &update.provider_customer_id, hint)?;
                hint.clone()
            }
            (None, None) => {
                return Err(DomainError::new(
                    ErrorCode::NoMatchingAccount,
                    format!(
                        "no account mapped to {} customer {}",
                        update.provider, update.provider_customer_id
                    ),
                ))
            }
        };

        match state.records.get_mut(&account_id) {
            Some(record) => {
                if policy == WritePolicy::RejectStale && record.is_stale(update.occurred_at) {
                    return Ok(UpsertOutcome::Stale {
                        account_id,
                        current: record.canonical_status,
                    });
                }
                let previous = record.canonical_status;
                record.apply(update);
                Ok(UpsertOutcome::from_transition(
                    account_id,
                    Some(previous),
                    record.canonical_status,
                ))
            }
            None => {
                let record = update.into_record(account_id.clone());
                let current = record.canonical_status;
                state.records.insert(account_id.clone(), record);
                Ok(UpsertOutcome::from_transition(account_id, None, current))
            }
        }
    }

    async fn create_pending(
        &self,
        account_id: &AccountId,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut state = self.state.write().await;
        if state.records.contains_key(account_id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                format!("account {} already has a subscription record", account_id),
            ));
        }
        let record =
            SubscriptionRecord::pending(account_id.clone(), provider, provider_customer_id.clone());
        state.records.insert(account_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self.state.read().await.records.get(account_id).cloned())
    }

    async fn resolve_customer(
        &self,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
    ) -> Result<Option<AccountId>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .customers
            .get(&(provider, provider_customer_id.clone()))
            .cloned())
    }

    async fn link_customer(
        &self,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
        account_id: &AccountId,
    ) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .link(provider, provider_customer_id, account_id)
    }

    async fn customer_ids(
        &self,
        provider: Provider,
    ) -> Result<Vec<ProviderCustomerId>, DomainError> {
        let state = self.state.read().await;
        let mut ids: Vec<_> = state
            .customers
            .keys()
            .filter(|(p, _)| *p == provider)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

//! Subscription store port.
//!
//! Durable per-account subscription state plus the provider customer mapping
//! used to route lifecycle events (keyed by provider customer id) back to an
//! account.
//!
//! # Guarantees
//!
//! - **One record per account**: `create_pending` never overwrites.
//! - **Atomic single-row upsert**: concurrent deliveries for one account
//!   never interleave partial writes.
//! - **Stable mapping**: a provider customer id resolves to at most one
//!   account; `link_customer` never re-points an existing mapping.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, ProviderCustomerId};
use crate::domain::subscription::{Provider, StatusUpdate, SubscriptionRecord, UpsertOutcome, WritePolicy};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Resolves the update's customer to an account and writes the status.
    ///
    /// When the customer is unmapped and the update carries an account hint,
    /// the mapping is created first.
    ///
    /// # Errors
    ///
    /// - `NoMatchingAccount` if the customer cannot be resolved
    /// - `DatabaseError` on storage failure
    async fn upsert(
        &self,
        update: &StatusUpdate,
        policy: WritePolicy,
    ) -> Result<UpsertOutcome, DomainError>;

    /// Creates the initial `pending_payment` record for a new account.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the account already has a record
    async fn create_pending(
        &self,
        account_id: &AccountId,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Finds the record for an account.
    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Looks up the account mapped to a provider customer.
    async fn resolve_customer(
        &self,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
    ) -> Result<Option<AccountId>, DomainError>;

    /// Maps a provider customer to an account.
    ///
    /// Linking an already-linked pair is a no-op.
    ///
    /// # Errors
    ///
    /// - `CustomerMappingConflict` if the customer maps to a different account
    async fn link_customer(
        &self,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
        account_id: &AccountId,
    ) -> Result<(), DomainError>;

    /// Every provider customer id with a local mapping, for reconciliation.
    async fn customer_ids(&self, provider: Provider)
        -> Result<Vec<ProviderCustomerId>, DomainError>;
}

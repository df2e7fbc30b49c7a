//! Status normalization.
//!
//! Each provider has an explicit lookup table from its native status string
//! to a [`CanonicalStatus`]. Nothing is inferred: a native value missing from
//! the table is an unknown status, and the event carrying it is not applied.
//!
//! Supporting another provider means registering one more table with
//! [`StatusNormalizer::with_table`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use super::{CanonicalStatus, Provider};

/// Native status → canonical status, for a single provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTable {
    provider: Provider,
    entries: HashMap<String, CanonicalStatus>,
}

impl StatusTable {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            entries: HashMap::new(),
        }
    }

    /// Adds (or replaces) a mapping.
    pub fn with(mut self, native: impl Into<String>, status: CanonicalStatus) -> Self {
        self.entries.insert(native.into(), status);
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn lookup(&self, native: &str) -> Option<CanonicalStatus> {
        self.entries.get(native.trim()).copied()
    }

    /// Iterates over every native status this table knows.
    pub fn entries(&self) -> impl Iterator<Item = (&str, CanonicalStatus)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Preapproval statuses.
pub static MERCADO_PAGO_STATUSES: Lazy<StatusTable> = Lazy::new(|| {
    StatusTable::new(Provider::MercadoPago)
        .with("authorized", CanonicalStatus::Active)
        .with("paused", CanonicalStatus::Paused)
        .with("cancelled", CanonicalStatus::Canceled)
        .with("pending", CanonicalStatus::PendingPayment)
});

/// Event types for checkout/invoice events, plus subscription object statuses
/// for `customer.subscription.*` events.
pub static STRIPE_STATUSES: Lazy<StatusTable> = Lazy::new(|| {
    StatusTable::new(Provider::Stripe)
        .with("checkout.session.completed", CanonicalStatus::Active)
        .with("invoice.payment_succeeded", CanonicalStatus::Active)
        .with("invoice.paid", CanonicalStatus::Active)
        .with("invoice.payment_failed", CanonicalStatus::Unpaid)
        .with("customer.subscription.deleted", CanonicalStatus::Canceled)
        .with("active", CanonicalStatus::Active)
        .with("trialing", CanonicalStatus::Active)
        .with("past_due", CanonicalStatus::PaymentFailed)
        .with("unpaid", CanonicalStatus::Unpaid)
        .with("paused", CanonicalStatus::Paused)
        .with("canceled", CanonicalStatus::Canceled)
        .with("incomplete_expired", CanonicalStatus::Canceled)
        .with("incomplete", CanonicalStatus::PendingPayment)
});

/// Failure to map a native status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("unknown {provider} status '{native}'")]
    UnknownStatus { provider: Provider, native: String },

    #[error("no status table registered for {0}")]
    NoTable(Provider),
}

/// Maps `(provider, native status)` to canonical status.
#[derive(Debug, Clone)]
pub struct StatusNormalizer {
    tables: HashMap<Provider, StatusTable>,
}

impl StatusNormalizer {
    /// A normalizer with no tables.
    pub fn empty() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Registers a table, replacing any existing table for its provider.
    pub fn with_table(mut self, table: StatusTable) -> Self {
        self.tables.insert(table.provider(), table);
        self
    }

    pub fn table(&self, provider: Provider) -> Option<&StatusTable> {
        self.tables.get(&provider)
    }

    pub fn normalize(
        &self,
        provider: Provider,
        native: &str,
    ) -> Result<CanonicalStatus, NormalizationError> {
        let table = self
            .tables
            .get(&provider)
            .ok_or(NormalizationError::NoTable(provider))?;

        table
            .lookup(native)
            .ok_or_else(|| NormalizationError::UnknownStatus {
                provider,
                native: native.to_string(),
            })
    }
}

impl Default for StatusNormalizer {
    fn default() -> Self {
        Self::empty()
            .with_table(STRIPE_STATUSES.clone())
            .with_table(MERCADO_PAGO_STATUSES.clone())
    }
}

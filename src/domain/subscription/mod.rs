//! Subscription domain.
//!
//! Canonical status, the per-provider normalization tables, the access gate,
//! and the error taxonomy of the webhook pipeline.

mod access;
mod event;
mod normalizer;
mod provider;
mod record;
mod status;
mod webhook_errors;

pub use access::{is_active, AccessDecision, BillingAction, DenialReason};
pub use event::ProviderEvent;
pub use normalizer::{
    NormalizationError, StatusNormalizer, StatusTable, MERCADO_PAGO_STATUSES, STRIPE_STATUSES,
};
pub use provider::Provider;
pub use record::{StatusUpdate, SubscriptionRecord, UpsertOutcome, WritePolicy};
pub use status::CanonicalStatus;
pub use webhook_errors::{ErrorClass, WebhookError};

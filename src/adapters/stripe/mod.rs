//! Stripe adapters: webhook verification and extraction, customer API.

mod customer_client;
mod event_adapter;
mod signature;
mod webhook_types;

pub use customer_client::{StripeClientConfig, StripeCustomerClient, DEFAULT_API_BASE_URL};
pub use event_adapter::{extract_event, StripeEventAdapter, SIGNATURE_HEADER};
pub use signature::{signature_header, SignatureHeader, StripeSignatureVerifier, DEFAULT_TOLERANCE_SECS};
pub use webhook_types::StripeWebhookEvent;

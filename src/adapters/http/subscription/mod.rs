//! HTTP adapter for subscription endpoints.
//!
//! - `POST /webhooks/stripe` - Stripe events (signed)
//! - `POST /webhooks/mercadopago` - Mercado Pago notifications
//! - `GET /internal/accounts/:account_id/access` - access gate
//! - `POST /internal/accounts` - provisioning
//! - `POST /internal/reconciliation` - reconciliation sweep

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{InternalApiError, SubscriptionAppState, WebhookApiError};
pub use routes::subscription_router;

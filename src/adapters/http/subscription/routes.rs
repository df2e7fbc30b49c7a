//! Axum router configuration for subscription endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers::{
    check_access, handle_mercadopago_webhook, handle_stripe_webhook, provision_account,
    run_reconciliation, SubscriptionAppState,
};
use crate::adapters::http::middleware::{require_internal_token, InternalToken};

/// Provider webhook routes. No caller authentication here: each adapter
/// authenticates the delivery itself (signature or authenticated fetch).
///
/// # Routes
/// - `POST /stripe`
/// - `POST /mercadopago`
pub fn webhook_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/stripe", post(handle_stripe_webhook))
        .route("/mercadopago", post(handle_mercadopago_webhook))
}

/// Internal routes, guarded by the internal bearer token.
///
/// # Routes
/// - `GET /accounts/:account_id/access` - access gate
/// - `POST /accounts` - provisioning
/// - `POST /reconciliation` - orphan customer sweep
pub fn internal_routes(token: InternalToken) -> Router<SubscriptionAppState> {
    Router::new()
        .route("/accounts", post(provision_account))
        .route("/accounts/:account_id/access", get(check_access))
        .route("/reconciliation", post(run_reconciliation))
        .route_layer(middleware::from_fn_with_state(token, require_internal_token))
}

/// Combined subscription router, to be mounted at the root.
pub fn subscription_router(token: InternalToken) -> Router<SubscriptionAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .nest("/internal", internal_routes(token))
}

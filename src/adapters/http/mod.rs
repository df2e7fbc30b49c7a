//! HTTP adapters - REST API implementations.

pub mod middleware;
pub mod subscription;

use std::time::Duration;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use middleware::InternalToken;
pub use subscription::{subscription_router, SubscriptionAppState};

/// Builds the complete application router with tracing, request ids and a
/// per-request timeout.
pub fn app(state: SubscriptionAppState, token: InternalToken, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(subscription::handlers::health))
        .merge(subscription_router(token))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

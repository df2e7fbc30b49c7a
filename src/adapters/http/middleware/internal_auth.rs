//! Bearer-token guard for `/internal/*` routes.
//!
//! Internal routes are called by trusted backends (the authentication system
//! after sign-up, operators running reconciliation). They share one static
//! token from configuration.
//!
//! ```text
//! Request → require_internal_token → handler
//!               │
//!               └─ 401 when the token is missing, wrong, or not configured
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::adapters::http::subscription::ErrorResponse;

/// Expected internal token. `None` locks every internal route.
#[derive(Clone, Default)]
pub struct InternalToken(Option<Arc<SecretString>>);

impl InternalToken {
    pub fn new(token: Option<&str>) -> Self {
        Self(
            token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| Arc::new(SecretString::new(t.to_string()))),
        )
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    fn matches(&self, presented: &str) -> bool {
        match &self.0 {
            Some(expected) => expected
                .expose_secret()
                .as_bytes()
                .ct_eq(presented.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for InternalToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InternalToken")
            .field(&self.0.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Rejects requests whose `Authorization: Bearer` token does not match.
pub async fn require_internal_token(
    State(token): State<InternalToken>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match presented {
        Some(presented) if token.matches(presented.trim()) => next.run(request).await,
        _ => {
            tracing::warn!(
                target: "security",
                path = %request.uri().path(),
                "Rejected internal request without valid token"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "AUTHENTICATION_REQUIRED",
                    "A valid internal API token is required",
                )),
            )
                .into_response()
        }
    }
}

//! HTTP middleware for axum.
//!
//! - `internal_auth` - static bearer token guard for internal routes

pub mod internal_auth;

pub use internal_auth::{require_internal_token, InternalToken};

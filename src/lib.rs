//! Subscription Sync - keeps account access in step with payment providers.
//!
//! Provider webhooks (Stripe, Mercado Pago) are authenticated, normalized to
//! a canonical status, and written to a per-account subscription record. The
//! access gate grants access only to `active` accounts and denies on any
//! doubt.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

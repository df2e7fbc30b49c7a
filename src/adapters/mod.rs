//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe`, `mercadopago` - provider webhook extraction and REST clients
//! - `postgres`, `memory` - subscription store implementations
//! - `http` - axum routes for webhooks and internal endpoints

pub mod http;
pub mod memory;
pub mod mercadopago;
pub mod postgres;
pub mod stripe;

pub use memory::InMemorySubscriptionStore;
pub use postgres::PostgresSubscriptionStore;

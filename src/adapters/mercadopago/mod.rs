//! Mercado Pago adapters: preapproval notifications and REST client.

mod api_client;
mod event_adapter;
mod notification;

pub use api_client::{MercadoPagoClient, MercadoPagoClientConfig, DEFAULT_API_BASE_URL};
pub use event_adapter::MercadoPagoEventAdapter;
pub use notification::Notification;

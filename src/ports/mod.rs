//! Ports - interfaces between the application core and infrastructure.

mod billing_provider;
mod provider_event_adapter;
mod subscription_store;

pub use billing_provider::{
    BillingProvider, CreateCustomerRequest, PaymentError, PaymentErrorCode, ProviderCustomer,
    SubscriptionDetail, SubscriptionDetailSource,
};
pub use provider_event_adapter::{InboundWebhook, ProviderEventAdapter};
pub use subscription_store::SubscriptionStore;

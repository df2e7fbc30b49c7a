//! Subscription command and query handlers.

mod check_access;
mod handle_provider_webhook;
mod provision_account;
mod reconcile_customers;

pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use handle_provider_webhook::{
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, WebhookReceipt,
};
pub use provision_account::{
    ProvisionAccountCommand, ProvisionAccountHandler, ProvisionAccountResult,
    ProvisionedCustomer, ProvisioningError,
};
pub use reconcile_customers::{ReconcileCustomersHandler, ReconciliationReport};

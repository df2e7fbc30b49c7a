//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod subscription;

pub use subscription::{
    // Commands
    HandleProviderWebhookCommand,
    HandleProviderWebhookHandler,
    ProvisionAccountCommand,
    ProvisionAccountHandler,
    ProvisionAccountResult,
    ProvisionedCustomer,
    ProvisioningError,
    WebhookReceipt,
    // Queries
    CheckAccessHandler,
    CheckAccessQuery,
    CheckAccessResult,
    ReconcileCustomersHandler,
    ReconciliationReport,
};

//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Commands (webhook sync, provisioning) are separated from queries (access
//! checks, reconciliation reports).

pub mod handlers;

pub use handlers::{
    CheckAccessHandler, CheckAccessQuery, CheckAccessResult, HandleProviderWebhookCommand,
    HandleProviderWebhookHandler, ProvisionAccountCommand, ProvisionAccountHandler,
    ProvisionAccountResult, ProvisionedCustomer, ProvisioningError, ReconcileCustomersHandler,
    ReconciliationReport, WebhookReceipt,
};

//! ProvisionAccountHandler - Command handler for new-account provisioning.
//!
//! Creates the account's customer at each configured provider, records the
//! customer mappings, then stores a `pending_payment` subscription record.
//!
//! Provider calls cannot be rolled back. When a store write fails after a
//! customer was created, the customer ids are logged as orphans and the
//! reconciliation sweep picks them up later.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::domain::subscription::{Provider, SubscriptionRecord};
use crate::ports::{
    BillingProvider, CreateCustomerRequest, PaymentError, ProviderCustomer, SubscriptionStore,
};

/// Command to provision a newly registered account.
#[derive(Debug, Clone)]
pub struct ProvisionAccountCommand {
    pub account_id: AccountId,
    pub email: String,
    pub name: Option<String>,
}

/// A customer created during provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedCustomer {
    pub provider: Provider,
    #[serde(flatten)]
    pub customer: ProviderCustomer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionAccountResult {
    pub record: SubscriptionRecord,
    pub customers: Vec<ProvisionedCustomer>,
}

/// Errors from provisioning.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account {0} is already provisioned")]
    AlreadyProvisioned(AccountId),

    #[error("No billing provider configured for provisioning")]
    NoProviders,

    #[error("{provider} customer creation failed: {source}")]
    Provider {
        provider: Provider,
        #[source]
        source: PaymentError,
    },

    #[error("Storage error: {source}")]
    Store {
        #[source]
        source: DomainError,
        /// Provider customers created before the failure.
        orphaned: Vec<ProvisionedCustomer>,
    },
}

impl ProvisioningError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProvisioningError::Provider { source, .. } => source.retryable,
            ProvisioningError::Store { .. } => true,
            _ => false,
        }
    }
}

pub struct ProvisionAccountHandler {
    providers: Vec<Arc<dyn BillingProvider>>,
    store: Arc<dyn SubscriptionStore>,
}

impl ProvisionAccountHandler {
    /// The first provider is the primary one: its customer id goes on the
    /// subscription record.
    pub fn new(providers: Vec<Arc<dyn BillingProvider>>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self { providers, store }
    }

    pub async fn handle(
        &self,
        cmd: ProvisionAccountCommand,
    ) -> Result<ProvisionAccountResult, ProvisioningError> {
        let email = cmd.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ProvisioningError::InvalidRequest(
                "email must be a valid address".to_string(),
            ));
        }
        if self.providers.is_empty() {
            return Err(ProvisioningError::NoProviders);
        }

        let account_id = cmd.account_id;
        let existing = self
            .store
            .find_by_account(&account_id)
            .await
            .map_err(|source| ProvisioningError::Store {
                source,
                orphaned: Vec::new(),
            })?;
        if existing.is_some() {
            return Err(ProvisioningError::AlreadyProvisioned(account_id));
        }

        let request = CreateCustomerRequest {
            account_id: account_id.clone(),
            email: email.to_string(),
            name: cmd.name.filter(|n| !n.trim().is_empty()),
        };

        let mut created: Vec<ProvisionedCustomer> = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.create_customer(&request).await {
                Ok(customer) => {
                    tracing::info!(
                        account_id = %account_id,
                        provider = %provider.provider(),
                        customer_id = %customer.id,
                        "Created provider customer"
                    );
                    created.push(ProvisionedCustomer {
                        provider: provider.provider(),
                        customer,
                    });
                }
                Err(source) => {
                    report_orphans(&account_id, &created);
                    return Err(ProvisioningError::Provider {
                        provider: provider.provider(),
                        source,
                    });
                }
            }
        }

        for entry in &created {
            if let Err(source) = self
                .store
                .link_customer(entry.provider, &entry.customer.id, &account_id)
                .await
            {
                report_orphans(&account_id, &created);
                return Err(ProvisioningError::Store {
                    source,
                    orphaned: created,
                });
            }
        }

        let primary = &created[0];
        let record = match self
            .store
            .create_pending(&account_id, primary.provider, &primary.customer.id)
            .await
        {
            Ok(record) => record,
            Err(e) if e.is(ErrorCode::SubscriptionExists) => {
                // Lost a race with a concurrent provisioning call.
                return Err(ProvisioningError::AlreadyProvisioned(account_id));
            }
            Err(source) => {
                report_orphans(&account_id, &created);
                return Err(ProvisioningError::Store {
                    source,
                    orphaned: created,
                });
            }
        };

        tracing::info!(
            account_id = %account_id,
            provider = %record.provider,
            status = %record.canonical_status,
            "Account provisioned"
        );

        Ok(ProvisionAccountResult {
            record,
            customers: created,
        })
    }
}

fn report_orphans(account_id: &AccountId, created: &[ProvisionedCustomer]) {
    if created.is_empty() {
        return;
    }
    let ids: Vec<String> = created
        .iter()
        .map(|c| format!("{}:{}", c.provider, c.customer.id))
        .collect();
    tracing::error!(
        account_id = %account_id,
        orphaned_customers = ?ids,
        "Provisioning aborted after provider customers were created"
    );
}

//! ReconcileCustomersHandler - finds provider customers with no local mapping.
//!
//! Such customers are left behind when provisioning fails between the
//! provider call and the store write.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::domain::subscription::Provider;
use crate::ports::{BillingProvider, ProviderCustomer, SubscriptionStore};

/// Per-provider sweep result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub provider: Provider,
    pub scanned: usize,
    pub orphans: Vec<ProviderCustomer>,
    /// Set when the provider or the store could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconciliationReport {
    fn failed(provider: Provider, error: String) -> Self {
        Self {
            provider,
            scanned: 0,
            orphans: Vec::new(),
            error: Some(error),
        }
    }
}

pub struct ReconcileCustomersHandler {
    providers: Vec<Arc<dyn BillingProvider>>,
    store: Arc<dyn SubscriptionStore>,
}

impl ReconcileCustomersHandler {
    pub fn new(providers: Vec<Arc<dyn BillingProvider>>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self { providers, store }
    }

    /// Sweeps all providers concurrently. A failing provider is reported in
    /// its own entry and does not abort the others.
    pub async fn handle(&self) -> Vec<ReconciliationReport> {
        join_all(self.providers.iter().map(|p| self.sweep(p.as_ref()))).await
    }

    async fn sweep(&self, billing: &dyn BillingProvider) -> ReconciliationReport {
        let provider = billing.provider();

        let customers = match billing.list_customers().await {
            Ok(customers) => customers,
            Err(e) => {
                tracing::error!(provider = %provider, error = %e, "Could not list provider customers");
                return ReconciliationReport::failed(provider, e.to_string());
            }
        };

        let known: HashSet<_> = match self.store.customer_ids(provider).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::error!(provider = %provider, error = %e, "Could not read customer mappings");
                return ReconciliationReport::failed(provider, e.to_string());
            }
        };

        let scanned = customers.len();
        let orphans: Vec<ProviderCustomer> = customers
            .into_iter()
            .filter(|c| !known.contains(&c.id))
            .collect();

        for orphan in &orphans {
            tracing::warn!(
                provider = %provider,
                customer_id = %orphan.id,
                account_reference = orphan.account_reference.as_deref().unwrap_or(""),
                "Provider customer has no account mapping"
            );
        }

        tracing::info!(
            provider = %provider,
            scanned,
            orphans = orphans.len(),
            "Reconciliation sweep finished"
        );

        ReconciliationReport {
            provider,
            scanned,
            orphans,
            error: None,
        }
    }
}

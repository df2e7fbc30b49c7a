//! Synchronization behavior configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::subscription::{Provider, WritePolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// `last_write_wins` (default) or `reject_stale`
    #[serde(default)]
    pub write_policy: WritePolicy,

    /// Providers that get a customer at provisioning, comma-separated.
    /// The first one is primary. Only providers whose events are keyed by
    /// that customer are accepted.
    #[serde(default = "default_provisioning_providers")]
    pub provisioning_providers: String,
}

impl SyncConfig {
    /// Parsed provisioning providers, in order, without duplicates.
    pub fn provisioning_providers(&self) -> Result<Vec<Provider>, ValidationError> {
        let mut providers = Vec::new();
        for raw in self.provisioning_providers.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let provider: Provider = raw
                .parse()
                .map_err(|_| ValidationError::UnknownProvider(raw.to_string()))?;
            if !provider.supports_provisioning() {
                return Err(ValidationError::ProviderCannotProvision(provider.to_string()));
            }
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }
        Ok(providers)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.provisioning_providers().map(|_| ())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::default(),
            provisioning_providers: default_provisioning_providers(),
        }
    }
}

fn default_provisioning_providers() -> String {
    "stripe".to_string()
}

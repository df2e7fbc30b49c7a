//! Provider event adapter port.
//!
//! One implementation per provider. An adapter authenticates a raw delivery,
//! fetches missing detail if the provider only sent an id, and extracts a
//! [`ProviderEvent`]. Adapters never write state.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::subscription::{Provider, ProviderEvent, WebhookError};

/// A raw webhook delivery, stripped of transport details.
#[derive(Debug, Clone, Default)]
pub struct InboundWebhook {
    /// Headers with lowercased names.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl InboundWebhook {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[async_trait]
pub trait ProviderEventAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Authenticates and extracts one delivery.
    ///
    /// # Errors
    ///
    /// Any [`WebhookError`]; its status code decides the provider's retry.
    async fn extract(&self, webhook: &InboundWebhook) -> Result<ProviderEvent, WebhookError>;
}

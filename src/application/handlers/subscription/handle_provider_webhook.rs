//! HandleProviderWebhookHandler - Command handler for provider webhook deliveries.
//!
//! Pipeline: adapter (authenticate, fetch, extract) → normalizer → store.
//! Every failure is logged according to its class and returned as a
//! [`WebhookError`], whose status code tells the provider whether to retry.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::ErrorCode;
use crate::domain::subscription::{
    CanonicalStatus, ErrorClass, NormalizationError, Provider, ProviderEvent, StatusNormalizer, UpsertOutcome,
    WebhookError, WritePolicy,
};
use crate::ports::{InboundWebhook, ProviderEventAdapter, SubscriptionStore};

/// Command carrying one raw delivery.
#[derive(Debug, Clone)]
pub struct HandleProviderWebhookCommand {
    pub webhook: InboundWebhook,
}

/// Acknowledgement for an applied (or harmlessly repeated) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookReceipt {
    pub provider: Provider,
    pub event_id: String,
    pub outcome: UpsertOutcome,
}

pub struct HandleProviderWebhookHandler {
    adapter: Arc<dyn ProviderEventAdapter>,
    normalizer: Arc<StatusNormalizer>,
    store: Arc<dyn SubscriptionStore>,
    write_policy: WritePolicy,
}

impl HandleProviderWebhookHandler {
    pub fn new(
        adapter: Arc<dyn ProviderEventAdapter>,
        normalizer: Arc<StatusNormalizer>,
        store: Arc<dyn SubscriptionStore>,
        write_policy: WritePolicy,
    ) -> Self {
        Self {
            adapter,
            normalizer,
            store,
            write_policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleProviderWebhookCommand,
    ) -> Result<WebhookReceipt, WebhookError> {
        let provider = self.adapter.provider();
        let result = self.process(&cmd.webhook).await;

        match &result {
            Ok(receipt) => log_receipt(receipt),
            Err(err) => log_failure(provider, err),
        }

        result
    }

    async fn process(&self, webhook: &InboundWebhook) -> Result<WebhookReceipt, WebhookError> {
        let event = self.adapter.extract(webhook).await?;
        let provider = event.provider;
        let event_id = event.event_id.clone();

        let status = self
            .normalizer
            .normalize(provider, &event.provider_native_status)
            .map_err(|e| match e {
                NormalizationError::UnknownStatus { provider, native } => {
                    WebhookError::UnknownStatus {
                        provider,
                        status: native,
                    }
                }
                NormalizationError::NoTable(p) => WebhookError::UnknownStatus {
                    provider: p,
                    status: event.provider_native_status.clone(),
                },
            })?;

        tracing::debug!(
            provider = %provider,
            event_id = %event_id,
            event_type = %event.event_type,
            native_status = %event.provider_native_status,
            status = %status,
            "Normalized provider event"
        );

        let outcome = self.apply(event, status).await?;

        Ok(WebhookReceipt {
            provider,
            event_id,
            outcome,
        })
    }

    async fn apply(
        &self,
        event: ProviderEvent,
        status: CanonicalStatus,
    ) -> Result<UpsertOutcome, WebhookError> {
        let provider = event.provider;
        let customer_id = event.provider_customer_id.to_string();
        let update = event.into_update(status);

        self.store
            .upsert(&update, self.write_policy)
            .await
            .map_err(|e| match e.code {
                ErrorCode::NoMatchingAccount | ErrorCode::CustomerMappingConflict => {
                    WebhookError::NoMatchingAccount {
                        provider,
                        customer_id,
                    }
                }
                _ => WebhookError::Storage(e.to_string()),
            })
    }
}

fn log_receipt(receipt: &WebhookReceipt) {
    match &receipt.outcome {
        UpsertOutcome::Applied {
            account_id,
            previous,
            current,
        } => tracing::info!(
            provider = %receipt.provider,
            event_id = %receipt.event_id,
            account_id = %account_id,
            previous = ?previous,
            status = %current,
            "Subscription status updated"
        ),
        UpsertOutcome::Unchanged {
            account_id,
            current,
        } => tracing::debug!(
            provider = %receipt.provider,
            event_id = %receipt.event_id,
            account_id = %account_id,
            status = %current,
            "Subscription status unchanged"
        ),
        UpsertOutcome::Stale {
            account_id,
            current,
        } => tracing::info!(
            provider = %receipt.provider,
            event_id = %receipt.event_id,
            account_id = %account_id,
            status = %current,
            "Skipped event older than stored status"
        ),
    }
}

fn log_failure(provider: Provider, err: &WebhookError) {
    let class = err.class().as_str();
    match err.class() {
        ErrorClass::Authentication => tracing::warn!(
            target: "security",
            provider = %provider,
            class,
            error = %err,
            "Rejected webhook with failed authentication"
        ),
        ErrorClass::Malformed | ErrorClass::PayloadDefect | ErrorClass::UnknownStatus => {
            tracing::warn!(
                provider = %provider,
                class,
                error = %err,
                "Webhook not applied"
            )
        }
        ErrorClass::Resolution => tracing::error!(
            provider = %provider,
            class,
            error = %err,
            "Webhook references a customer with no account mapping"
        ),
        ErrorClass::UpstreamTransient | ErrorClass::Storage => tracing::error!(
            provider = %provider,
            class,
            error = %err,
            "Webhook processing failed; provider will redeliver"
        ),
        ErrorClass::Ignored => tracing::debug!(provider = %provider, error = %err, "Webhook ignored"),
    }
}

//! Mercado Pago event adapter.
//!
//! Notifications are unauthenticated and carry only a preapproval id. The
//! status is taken from an authenticated read against the API, which is what
//! makes the event trustworthy. Any failure of that read asks the provider to
//! redeliver.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, ProviderCustomerId};
use crate::domain::subscription::{Provider, ProviderEvent, WebhookError};
use crate::ports::{InboundWebhook, ProviderEventAdapter, SubscriptionDetailSource};

use super::notification::Notification;

pub struct MercadoPagoEventAdapter {
    source: Arc<dyn SubscriptionDetailSource>,
    api_base_url: String,
}

impl MercadoPagoEventAdapter {
    /// `api_base_url` bounds which resource URLs a notification may name.
    pub fn new(source: Arc<dyn SubscriptionDetailSource>, api_base_url: impl Into<String>) -> Self {
        Self {
            source,
            api_base_url: api_base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderEventAdapter for MercadoPagoEventAdapter {
    fn provider(&self) -> Provider {
        Provider::MercadoPago
    }

    async fn extract(&self, webhook: &InboundWebhook) -> Result<ProviderEvent, WebhookError> {
        let notification = Notification::parse(&webhook.body)?;
        let preapproval_id = notification.preapproval_id(&self.api_base_url)?;

        let detail = self
            .source
            .fetch_subscription(&preapproval_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    preapproval_id = %preapproval_id,
                    error = %e,
                    "Preapproval fetch failed"
                );
                WebhookError::UpstreamUnavailable(e.to_string())
            })?;

        if detail.status.trim().is_empty() {
            return Err(WebhookError::MissingField("status"));
        }

        let provider_customer_id = detail
            .customer_id
            .as_deref()
            .and_then(|id| ProviderCustomerId::new(id).ok())
            .ok_or(WebhookError::MissingField("payer_id"))?;

        let account_hint = detail
            .account_reference
            .as_deref()
            .and_then(|r| AccountId::new(r).ok());

        let event_type = notification
            .action
            .clone()
            .map(|action| format!("preapproval.{}", action))
            .unwrap_or_else(|| "preapproval".to_string());

        Ok(ProviderEvent {
            provider: Provider::MercadoPago,
            event_id: notification.delivery_id().unwrap_or_else(|| detail.id.clone()),
            event_type,
            provider_customer_id,
            provider_native_status: detail.status,
            provider_subscription_id: Some(detail.id),
            account_hint,
            occurred_at: detail.last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::ports::{PaymentError, SubscriptionDetail};
    use serde_json::json;
    use std::sync::Mutex;

    const BASE: &str = "https://api.mercadopago.com";

    // ══════════════════════════════════════════════════════════════
    // Mock detail source
    // ══════════════════════════════════════════════════════════════

    struct MockSource {
        result: Result<SubscriptionDetail, PaymentError>,
        requested: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn returning(detail: SubscriptionDetail) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(detail),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: PaymentError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(err),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SubscriptionDetailSource for MockSource {
        async fn fetch_subscription(&self, id: &str) -> Result<SubscriptionDetail, PaymentError> {
            self.requested.lock().unwrap().push(id.to_string());
            self.result.clone()
        }
    }

    fn detail(status: &str) -> SubscriptionDetail {
        SubscriptionDetail {
            id: "pre_1".to_string(),
            status: status.to_string(),
            customer_id: Some("1122334455".to_string()),
            account_reference: Some("acc_1".to_string()),
            last_modified: Timestamp::parse_rfc3339("2024-03-01T12:00:00Z"),
        }
    }

    fn webhook(body: serde_json::Value) -> InboundWebhook {
        InboundWebhook::new(serde_json::to_vec(&body).unwrap())
    }

    #[tokio::test]
    async fn fetches_detail_and_extracts_event() {
        let source = MockSource::returning(detail("authorized"));
        let adapter = MercadoPagoEventAdapter::new(source.clone(), BASE);

        let event = adapter
            .extract(&webhook(json!({
                "topic": "preapproval",
                "resource": "https://api.mercadopago.com/preapproval/pre_1"
            })))
            .await
            .unwrap();

        assert_eq!(source.requested.lock().unwrap().as_slice(), ["pre_1"]);
        assert_eq!(event.provider, Provider::MercadoPago);
        assert_eq!(event.provider_native_status, "authorized");
        assert_eq!(event.provider_customer_id.as_str(), "1122334455");
        assert_eq!(event.provider_subscription_id.as_deref(), Some("pre_1"));
        assert_eq!(event.account_hint.unwrap().as_str(), "acc_1");
        assert_eq!(event.event_type, "preapproval");
    }

    #[tokio::test]
    async fn action_is_reflected_in_event_type() {
        let adapter = MercadoPagoEventAdapter::new(MockSource::returning(detail("paused")), BASE);
        let event = adapter
            .extract(&webhook(json!({
                "type": "subscription_preapproval",
                "action": "updated",
                "data": {"id": "pre_1"},
                "id": 555
            })))
            .await
            .unwrap();
        assert_eq!(event.event_type, "preapproval.updated");
        assert_eq!(event.event_id, "555");
    }

    #[tokio::test]
    async fn upstream_failure_is_retryable() {
        let adapter = MercadoPagoEventAdapter::new(
            MockSource::failing(PaymentError::timeout("10s elapsed")),
            BASE,
        );
        let err = adapter
            .extract(&webhook(json!({"topic": "preapproval", "resource": "pre_1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::UpstreamUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn upstream_auth_failure_is_retryable() {
        let adapter = MercadoPagoEventAdapter::new(
            MockSource::failing(PaymentError::from_status(401, "invalid access token")),
            BASE,
        );
        let err = adapter
            .extract(&webhook(json!({"topic": "preapproval", "resource": "pre_1"})))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn missing_payer_is_payload_defect() {
        let mut d = detail("authorized");
        d.customer_id = None;
        let adapter = MercadoPagoEventAdapter::new(MockSource::returning(d), BASE);
        let err = adapter
            .extract(&webhook(json!({"topic": "preapproval", "resource": "pre_1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("payer_id")));
    }

    #[tokio::test]
    async fn non_preapproval_topics_skip_the_fetch() {
        let source = MockSource::returning(detail("authorized"));
        let adapter = MercadoPagoEventAdapter::new(source.clone(), BASE);
        let err = adapter
            .extract(&webhook(json!({"topic": "merchant_order", "resource": "1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Ignored(_)));
        assert!(source.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn untrusted_resource_is_never_fetched() {
        let source = MockSource::returning(detail("authorized"));
        let adapter = MercadoPagoEventAdapter::new(source.clone(), BASE);
        let err = adapter
            .extract(&webhook(json!({
                "topic": "preapproval",
                "resource": "https://attacker.example/preapproval/pre_1"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
        assert!(source.requested.lock().unwrap().is_empty());
    }
}

//! Stripe event adapter.
//!
//! Stripe payloads are signed and self-contained, so no follow-up read is
//! needed. The native status is the event type for checkout and invoice
//! events, and the subscription object's own `status` for
//! `customer.subscription.*` events.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::domain::foundation::{AccountId, ProviderCustomerId, Timestamp};
use crate::domain::subscription::{Provider, ProviderEvent, WebhookError};
use crate::ports::{InboundWebhook, ProviderEventAdapter};

use super::signature::StripeSignatureVerifier;
use super::webhook_types::{
    StripeCheckoutSession, StripeInvoice, StripeRef, StripeSubscription, StripeWebhookEvent,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const INVOICE_EVENTS: [&str; 3] = [
    "invoice.payment_failed",
    "invoice.payment_succeeded",
    "invoice.paid",
];
const SUBSCRIPTION_PREFIX: &str = "customer.subscription.";

pub struct StripeEventAdapter {
    verifier: StripeSignatureVerifier,
    require_livemode: bool,
}

impl StripeEventAdapter {
    pub fn new(verifier: StripeSignatureVerifier) -> Self {
        Self {
            verifier,
            require_livemode: false,
        }
    }

    /// Ignore test-mode events (production endpoints).
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    fn parse_event(&self, payload: &[u8]) -> Result<StripeWebhookEvent, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
impl ProviderEventAdapter for StripeEventAdapter {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    async fn extract(&self, webhook: &InboundWebhook) -> Result<ProviderEvent, WebhookError> {
        let signature = webhook
            .header(SIGNATURE_HEADER)
            .ok_or(WebhookError::InvalidSignature)?;

        self.verifier.verify(&webhook.body, signature)?;

        let event = self.parse_event(&webhook.body)?;

        if self.require_livemode && !event.livemode {
            return Err(WebhookError::Ignored(format!(
                "test mode event {} on live endpoint",
                event.id
            )));
        }

        extract_event(event)
    }
}

/// Turns a verified event into a [`ProviderEvent`].
pub fn extract_event(event: StripeWebhookEvent) -> Result<ProviderEvent, WebhookError> {
    let extracted = match event.event_type.as_str() {
        CHECKOUT_COMPLETED => {
            let session: StripeCheckoutSession = object(&event)?;
            let hint = session
                .client_reference_id
                .clone()
                .or_else(|| session.metadata.get("account_id").cloned());
            Extracted {
                customer: session.customer,
                subscription_id: session.subscription.map(|s| s.id().to_string()),
                native_status: event.event_type.clone(),
                account_hint: hint,
            }
        }
        t if INVOICE_EVENTS.contains(&t) => {
            let invoice: StripeInvoice = object(&event)?;
            Extracted {
                customer: invoice.customer,
                subscription_id: invoice.subscription.map(|s| s.id().to_string()),
                native_status: event.event_type.clone(),
                account_hint: None,
            }
        }
        t if t.starts_with(SUBSCRIPTION_PREFIX) => {
            let subscription: StripeSubscription = object(&event)?;
            Extracted {
                customer: subscription.customer,
                subscription_id: Some(subscription.id),
                native_status: subscription
                    .status
                    .unwrap_or_else(|| event.event_type.clone()),
                account_hint: None,
            }
        }
        other => {
            return Err(WebhookError::Ignored(format!(
                "unhandled event type {}",
                other
            )))
        }
    };

    let customer = extracted
        .customer
        .ok_or(WebhookError::MissingField("customer"))?;
    let provider_customer_id =
        ProviderCustomerId::new(customer.id()).map_err(|_| WebhookError::MissingField("customer"))?;

    // A malformed hint must not block the status write.
    let account_hint = extracted
        .account_hint
        .and_then(|hint| AccountId::new(hint).ok());

    Ok(ProviderEvent {
        provider: Provider::Stripe,
        event_id: event.id,
        event_type: event.event_type,
        provider_customer_id,
        provider_native_status: extracted.native_status,
        provider_subscription_id: extracted.subscription_id,
        account_hint,
        occurred_at: Timestamp::from_unix_secs(event.created),
    })
}

struct Extracted {
    customer: Option<StripeRef>,
    subscription_id: Option<String>,
    native_status: String,
    account_hint: Option<String>,
}

fn object<T: DeserializeOwned>(event: &StripeWebhookEvent) -> Result<T, WebhookError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| WebhookError::MalformedPayload(format!("{} object: {}", event.event_type, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::signature::signature_header;
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "whsec_adapter_test";

    fn adapter() -> StripeEventAdapter {
        StripeEventAdapter::new(StripeSignatureVerifier::new(SecretString::new(SECRET.to_string())))
    }

    fn event(event_type: &str, object: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "evt_123",
            "type": event_type,
            "created": 1_700_000_000,
            "livemode": false,
            "data": { "object": object }
        })
    }

    fn signed_webhook(body: &serde_json::Value) -> InboundWebhook {
        let payload = serde_json::to_vec(body).unwrap();
        let header = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload).unwrap();
        InboundWebhook::new(payload).with_header("Stripe-Signature", header)
    }

    fn parsed(body: serde_json::Value) -> StripeWebhookEvent {
        serde_json::from_value(body).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Extraction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn checkout_completed_uses_event_type_and_client_reference() {
        let e = extract_event(parsed(event(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "customer": "cus_A",
                "subscription": "sub_A",
                "client_reference_id": "acc_1"
            }),
        )))
        .unwrap();

        assert_eq!(e.provider_native_status, "checkout.session.completed");
        assert_eq!(e.provider_customer_id.as_str(), "cus_A");
        assert_eq!(e.provider_subscription_id.as_deref(), Some("sub_A"));
        assert_eq!(e.account_hint.unwrap().as_str(), "acc_1");
        assert_eq!(e.occurred_at, Timestamp::from_unix_secs(1_700_000_000));
    }

    #[test]
    fn checkout_hint_falls_back_to_metadata() {
        let e = extract_event(parsed(event(
            "checkout.session.completed",
            json!({"id": "cs_1", "customer": "cus_A", "metadata": {"account_id": "acc_meta"}}),
        )))
        .unwrap();
        assert_eq!(e.account_hint.unwrap().as_str(), "acc_meta");
    }

    #[test]
    fn invoice_failed_has_no_hint() {
        let e = extract_event(parsed(event(
            "invoice.payment_failed",
            json!({"id": "in_1", "customer": "cus_A", "subscription": "sub_A"}),
        )))
        .unwrap();
        assert_eq!(e.provider_native_status, "invoice.payment_failed");
        assert!(e.account_hint.is_none());
    }

    #[test]
    fn subscription_event_passes_object_status_through() {
        let e = extract_event(parsed(event(
            "customer.subscription.updated",
            json!({"id": "sub_A", "customer": "cus_A", "status": "past_due"}),
        )))
        .unwrap();
        assert_eq!(e.provider_native_status, "past_due");
        assert_eq!(e.provider_subscription_id.as_deref(), Some("sub_A"));
    }

    #[test]
    fn subscription_event_without_status_falls_back_to_type() {
        let e = extract_event(parsed(event(
            "customer.subscription.deleted",
            json!({"id": "sub_A", "customer": {"id": "cus_A"}}),
        )))
        .unwrap();
        assert_eq!(e.provider_native_status, "customer.subscription.deleted");
        assert_eq!(e.provider_customer_id.as_str(), "cus_A");
    }

    #[test]
    fn missing_customer_is_payload_defect() {
        let result = extract_event(parsed(event(
            "invoice.payment_failed",
            json!({"id": "in_1", "customer": null}),
        )));
        assert!(matches!(result, Err(WebhookError::MissingField("customer"))));
    }

    #[test]
    fn unhandled_type_is_ignored() {
        let result = extract_event(parsed(event("charge.refunded", json!({"id": "ch_1"}))));
        assert!(matches!(result, Err(WebhookError::Ignored(_))));
    }

    #[test]
    fn mistyped_object_is_malformed() {
        let result = extract_event(parsed(event("invoice.paid", json!("not an object"))));
        assert!(matches!(result, Err(WebhookError::MalformedPayload(_))));
    }

    #[test]
    fn invalid_hint_is_dropped() {
        let e = extract_event(parsed(event(
            "checkout.session.completed",
            json!({"id": "cs_1", "customer": "cus_A", "client_reference_id": "   "}),
        )))
        .unwrap();
        assert!(e.account_hint.is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Adapter
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn extracts_signed_delivery() {
        let body = event("invoice.payment_succeeded", json!({"id": "in_1", "customer": "cus_A"}));
        let e = adapter().extract(&signed_webhook(&body)).await.unwrap();
        assert_eq!(e.provider, Provider::Stripe);
        assert_eq!(e.event_id, "evt_123");
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let body = serde_json::to_vec(&event("invoice.paid", json!({"customer": "cus_A"}))).unwrap();
        let result = adapter().extract(&InboundWebhook::new(body)).await;
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_parsing() {
        let webhook = InboundWebhook::new(b"not json".to_vec())
            .with_header("stripe-signature", format!("t={},v1=00ff", chrono::Utc::now().timestamp()));
        let result = adapter().extract(&webhook).await;
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn signed_garbage_is_malformed() {
        let payload = b"not json".to_vec();
        let header = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload).unwrap();
        let webhook = InboundWebhook::new(payload).with_header("stripe-signature", header);
        assert!(matches!(
            adapter().extract(&webhook).await,
            Err(WebhookError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn live_endpoint_ignores_test_events() {
        let body = event("invoice.paid", json!({"id": "in_1", "customer": "cus_A"}));
        let result = adapter()
            .with_require_livemode(true)
            .extract(&signed_webhook(&body))
            .await;
        assert!(matches!(result, Err(WebhookError::Ignored(_))));
    }
}

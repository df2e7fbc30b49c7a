//! Mercado Pago notification payloads.
//!
//! Two shapes are delivered for preapproval (subscription) changes:
//!
//! ```text
//! {"topic": "preapproval", "resource": "https://api.mercadopago.com/preapproval/2c938084..."}
//! {"type": "subscription_preapproval", "action": "updated", "data": {"id": "2c938084..."}}
//! ```
//!
//! Neither carries the status; it has to be read back from the API.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::subscription::WebhookError;

const PREAPPROVAL_KINDS: [&str; 2] = ["preapproval", "subscription_preapproval"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notification {
    pub topic: Option<String>,
    pub resource: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub action: Option<String>,
    pub data: Option<NotificationData>,
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationData {
    pub id: Option<Value>,
}

impl Notification {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }

    /// `topic` for the legacy shape, `type` for the current one.
    pub fn kind(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .or(self.notification_type.as_deref())
    }

    pub fn is_preapproval(&self) -> bool {
        self.kind()
            .map(|k| PREAPPROVAL_KINDS.contains(&k))
            .unwrap_or(false)
    }

    /// Delivery id for log correlation.
    pub fn delivery_id(&self) -> Option<String> {
        self.id.as_ref().and_then(value_to_id)
    }

    /// Resolves the preapproval id this notification refers to.
    ///
    /// Resource URLs are trusted only under `{api_base_url}/preapproval/`,
    /// so an unauthenticated notification cannot point the follow-up read
    /// at another host.
    pub fn preapproval_id(&self, api_base_url: &str) -> Result<String, WebhookError> {
        if !self.is_preapproval() {
            return Err(WebhookError::Ignored(format!(
                "notification kind {} not handled",
                self.kind().unwrap_or("<none>")
            )));
        }

        if let Some(id) = self
            .data
            .as_ref()
            .and_then(|d| d.id.as_ref())
            .and_then(value_to_id)
        {
            return validate_id(&id);
        }

        let resource = self
            .resource
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(WebhookError::MissingField("resource"))?;

        if resource.contains("://") {
            let prefix = format!("{}/preapproval/", api_base_url.trim_end_matches('/'));
            let rest = resource.strip_prefix(&prefix).ok_or_else(|| {
                WebhookError::MalformedPayload(format!("untrusted resource URL {}", resource))
            })?;
            let id = rest.split(['?', '#']).next().unwrap_or_default();
            validate_id(id)
        } else {
            validate_id(resource)
        }
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn validate_id(id: &str) -> Result<String, WebhookError> {
    let valid = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id.to_string())
    } else {
        Err(WebhookError::MalformedPayload(format!(
            "invalid preapproval id '{}'",
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://api.mercadopago.com";

    fn parse(value: Value) -> Notification {
        Notification::parse(&serde_json::to_vec(&value).unwrap()).unwrap()
    }

    #[test]
    fn topic_shape_with_trusted_url() {
        let n = parse(json!({
            "topic": "preapproval",
            "resource": "https://api.mercadopago.com/preapproval/2c9380847e9b451c017ea1bd70ba0219"
        }));
        assert_eq!(n.preapproval_id(BASE).unwrap(), "2c9380847e9b451c017ea1bd70ba0219");
    }

    #[test]
    fn topic_shape_with_bare_id() {
        let n = parse(json!({"topic": "preapproval", "resource": "abc123"}));
        assert_eq!(n.preapproval_id(BASE).unwrap(), "abc123");
    }

    #[test]
    fn type_shape_with_data_id() {
        let n = parse(json!({
            "type": "subscription_preapproval",
            "action": "updated",
            "data": {"id": "pre_42"},
            "id": 12345678
        }));
        assert_eq!(n.preapproval_id(BASE).unwrap(), "pre_42");
        assert_eq!(n.delivery_id().as_deref(), Some("12345678"));
    }

    #[test]
    fn numeric_data_id_is_accepted() {
        let n = parse(json!({"type": "preapproval", "data": {"id": 987}}));
        assert_eq!(n.preapproval_id(BASE).unwrap(), "987");
    }

    #[test]
    fn query_string_is_dropped_from_resource() {
        let n = parse(json!({
            "topic": "preapproval",
            "resource": "https://api.mercadopago.com/preapproval/abc?foo=bar"
        }));
        assert_eq!(n.preapproval_id(BASE).unwrap(), "abc");
    }

    #[test]
    fn foreign_host_is_rejected() {
        let n = parse(json!({
            "topic": "preapproval",
            "resource": "http://169.254.169.254/latest/meta-data"
        }));
        assert!(matches!(n.preapproval_id(BASE), Err(WebhookError::MalformedPayload(_))));
    }

    #[test]
    fn path_traversal_in_id_is_rejected() {
        let n = parse(json!({
            "topic": "preapproval",
            "resource": "https://api.mercadopago.com/preapproval/../v1/payments"
        }));
        assert!(n.preapproval_id(BASE).is_err());
    }

    #[test]
    fn other_topics_are_ignored() {
        let n = parse(json!({"topic": "payment", "resource": "123"}));
        assert!(matches!(n.preapproval_id(BASE), Err(WebhookError::Ignored(_))));

        let n = parse(json!({"action": "test.created"}));
        assert!(matches!(n.preapproval_id(BASE), Err(WebhookError::Ignored(_))));
    }

    #[test]
    fn preapproval_without_reference_is_payload_defect() {
        let n = parse(json!({"topic": "preapproval"}));
        assert!(matches!(n.preapproval_id(BASE), Err(WebhookError::MissingField("resource"))));
    }

    #[test]
    fn unparsable_body_is_malformed() {
        assert!(matches!(
            Notification::parse(b"topic=preapproval"),
            Err(WebhookError::MalformedPayload(_))
        ));
    }
}

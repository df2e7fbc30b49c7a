//! Stripe API payload types.
//!
//! Only the fields the synchronization pipeline reads are modeled.

use std::collections::HashMap;

use serde::Deserialize;

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix timestamp of event creation.
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// A reference that is either an id or an expanded object carrying one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StripeRef {
    Id(String),
    Expanded { id: String },
}

impl StripeRef {
    pub fn id(&self) -> &str {
        match self {
            StripeRef::Id(id) | StripeRef::Expanded { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub customer: Option<StripeRef>,
    pub subscription: Option<StripeRef>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: Option<StripeRef>,
    pub subscription: Option<StripeRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Option<StripeRef>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

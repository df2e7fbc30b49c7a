//! Mercado Pago REST client.
//!
//! Bearer-token authenticated reads of preapprovals.
//!
//! There is no customer API here: preapprovals identify the payer by their
//! Mercado Pago user id, which no customer created through `/v1/customers`
//! ever matches.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::foundation::Timestamp;
use crate::ports::{PaymentError, SubscriptionDetail, SubscriptionDetailSource};

pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";

#[derive(Clone)]
pub struct MercadoPagoClientConfig {
    pub access_token: SecretString,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl MercadoPagoClientConfig {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            access_token,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct Preapproval {
    id: String,
    status: Option<String>,
    payer_id: Option<Value>,
    external_reference: Option<String>,
    last_modified: Option<String>,
}

pub struct MercadoPagoClient {
    config: MercadoPagoClientConfig,
    http_client: reqwest::Client,
}

impl MercadoPagoClient {
    pub fn new(config: MercadoPagoClientConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PaymentError::from_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl SubscriptionDetailSource for MercadoPagoClient {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionDetail, PaymentError> {
        let url = format!("{}/preapproval/{}", self.config.api_base_url, subscription_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(map_transport_error)?;

        let preapproval: Preapproval = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::invalid_response(format!("Failed to parse preapproval: {}", e)))?;

        Ok(SubscriptionDetail {
            id: preapproval.id,
            status: preapproval.status.unwrap_or_default(),
            customer_id: preapproval.payer_id.as_ref().and_then(payer_id_to_string),
            account_reference: preapproval.external_reference.filter(|r| !r.trim().is_empty()),
            last_modified: preapproval
                .last_modified
                .as_deref()
                .and_then(Timestamp::parse_rfc3339),
        })
    }
}

fn payer_id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn map_transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(e.to_string())
    } else {
        PaymentError::network(e.to_string())
    }
}

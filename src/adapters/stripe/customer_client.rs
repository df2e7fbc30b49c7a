//! Stripe REST client for customer management.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::ProviderCustomerId;
use crate::domain::subscription::Provider;
use crate::ports::{BillingProvider, CreateCustomerRequest, PaymentError, ProviderCustomer};

use super::webhook_types::{StripeCustomer, StripeList};

pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

const PAGE_SIZE: u32 = 100;

/// Stripe API credentials and endpoint.
#[derive(Clone)]
pub struct StripeClientConfig {
    pub api_key: SecretString,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl StripeClientConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the API base (stripe-mock, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

pub struct StripeCustomerClient {
    config: StripeClientConfig,
    http_client: reqwest::Client,
}

impl StripeCustomerClient {
    pub fn new(config: StripeClientConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn to_customer(customer: StripeCustomer) -> Result<ProviderCustomer, PaymentError> {
        let id = ProviderCustomerId::new(customer.id)
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?;
        Ok(ProviderCustomer {
            id,
            email: customer.email,
            account_reference: customer.metadata.get("account_id").cloned(),
        })
    }
}

#[async_trait]
impl BillingProvider for StripeCustomerClient {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    async fn create_customer(
        &self,
        request: &CreateCustomerRequest,
    ) -> Result<ProviderCustomer, PaymentError> {
        let url = format!("{}/v1/customers", self.config.api_base_url);

        let mut params = vec![
            ("email", request.email.clone()),
            ("metadata[account_id]", request.account_id.to_string()),
        ];
        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            // Retried provisioning for the same account reuses the first customer.
            .header("Idempotency-Key", format!("customer-{}", request.account_id))
            .form(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %body, "Stripe create_customer failed");
            return Err(PaymentError::from_status(status.as_u16(), &body));
        }

        let customer: StripeCustomer = response
            .json()
            .await
            .map_err(|e| PaymentError::invalid_response(format!("Failed to parse Stripe customer: {}", e)))?;

        Self::to_customer(customer)
    }

    async fn list_customers(&self) -> Result<Vec<ProviderCustomer>, PaymentError> {
        let url = format!("{}/v1/customers", self.config.api_base_url);
        let mut customers = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_SIZE.to_string())];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after", cursor.clone()));
            }

            let response = self
                .http_client
                .get(&url)
                .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
                .query(&query)
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(PaymentError::from_status(status.as_u16(), &body));
            }

            let page: StripeList<StripeCustomer> = response
                .json()
                .await
                .map_err(|e| PaymentError::invalid_response(e.to_string()))?;

            starting_after = page.data.last().map(|c| c.id.clone());
            let has_more = page.has_more;
            for customer in page.data {
                customers.push(Self::to_customer(customer)?);
            }

            if !has_more || starting_after.is_none() {
                break;
            }
        }

        tracing::debug!(count = customers.len(), "Listed Stripe customers");
        Ok(customers)
    }
}

fn map_transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(e.to_string())
    } else {
        PaymentError::network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = StripeClientConfig::new(SecretString::new("sk_test_x".to_string()))
            .with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    #[test]
    fn customer_metadata_becomes_account_reference() {
        let customer: StripeCustomer = serde_json::from_value(serde_json::json!({
            "id": "cus_1",
            "email": "owner@dealer.test",
            "metadata": {"account_id": "acc_1"}
        }))
        .unwrap();
        let mapped = StripeCustomerClient::to_customer(customer).unwrap();
        assert_eq!(mapped.id.as_str(), "cus_1");
        assert_eq!(mapped.account_reference.as_deref(), Some("acc_1"));
    }

    #[tokio::test]
    async fn unreachable_api_is_retryable_network_error() {
        let config = StripeClientConfig::new(SecretString::new("sk_test_x".to_string()))
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let client = StripeCustomerClient::new(config).unwrap();

        let err = client.list_customers().await.unwrap_err();
        assert!(err.retryable);
    }
}

//! Payment provider configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration. A provider whose credentials are blank is disabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub stripe: StripeSettings,

    #[serde(default)]
    pub mercadopago: MercadoPagoSettings,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.stripe.is_enabled() && !self.mercadopago.is_enabled() {
            return Err(ValidationError::NoProviderConfigured);
        }
        if self.stripe.is_enabled() {
            self.stripe.validate()?;
        }
        if self.mercadopago.is_enabled() {
            self.mercadopago.validate()?;
        }
        Ok(())
    }
}

/// Stripe settings
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    /// Secret API key (`sk_test_...` / `sk_live_...`)
    #[serde(default)]
    pub api_key: String,

    /// Webhook signing secret (`whsec_...`)
    #[serde(default)]
    pub webhook_secret: String,

    #[serde(default = "default_stripe_base_url")]
    pub api_base_url: String,

    /// Reject test-mode events
    #[serde(default)]
    pub require_livemode: bool,

    /// Maximum age of a signed delivery
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl StripeSettings {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() || !self.webhook_secret.is_empty()
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.api_key.starts_with("sk_live_")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE__API_KEY"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE__WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::InvalidApiBaseUrl("stripe"));
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            webhook_secret: String::new(),
            api_base_url: default_stripe_base_url(),
            require_livemode: false,
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

/// Mercado Pago settings
#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoSettings {
    /// Bearer token for the REST API
    #[serde(default)]
    pub access_token: String,

    /// Base URL; also bounds which resource URLs notifications may reference
    #[serde(default = "default_mercadopago_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_mercadopago_timeout")]
    pub request_timeout_secs: u64,
}

impl MercadoPagoSettings {
    pub fn is_enabled(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_token.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__MERCADOPAGO__ACCESS_TOKEN",
            ));
        }
        if !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::InvalidApiBaseUrl("mercadopago"));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for MercadoPagoSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base_url: default_mercadopago_base_url(),
            request_timeout_secs: default_mercadopago_timeout(),
        }
    }
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_signature_tolerance() -> i64 {
    300
}

fn default_mercadopago_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_mercadopago_timeout() -> u64 {
    10
}

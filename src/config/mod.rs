//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SUBSCRIPTION_SYNC` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use subscription_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod payment;
mod server;
mod sync;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{MercadoPagoSettings, PaymentConfig, StripeSettings};
pub use server::{Environment, ServerConfig};
pub use sync::SyncConfig;

use serde::Deserialize;

use crate::domain::subscription::Provider;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, internal token)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment provider credentials
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Write policy and provisioning providers
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUBSCRIPTION_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SUBSCRIPTION_SYNC__PAYMENT__STRIPE__API_KEY=...` -> `payment.stripe.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_SYNC")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Besides per-section checks, every provider listed for provisioning
    /// must also be configured.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.sync.validate()?;

        for provider in self.sync.provisioning_providers()? {
            if !self.provider_enabled(provider) {
                return Err(ValidationError::ProviderNotConfigured(provider.to_string()));
            }
        }
        Ok(())
    }

    pub fn provider_enabled(&self, provider: Provider) -> bool {
        match provider {
            Provider::Stripe => self.payment.stripe.is_enabled(),
            Provider::MercadoPago => self.payment.mercadopago.is_enabled(),
        }
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::WritePolicy;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "SUBSCRIPTION_SYNC__DATABASE__URL",
        "SUBSCRIPTION_SYNC__PAYMENT__STRIPE__API_KEY",
        "SUBSCRIPTION_SYNC__PAYMENT__STRIPE__WEBHOOK_SECRET",
        "SUBSCRIPTION_SYNC__PAYMENT__MERCADOPAGO__ACCESS_TOKEN",
        "SUBSCRIPTION_SYNC__SERVER__PORT",
        "SUBSCRIPTION_SYNC__SERVER__ENVIRONMENT",
        "SUBSCRIPTION_SYNC__SYNC__WRITE_POLICY",
        "SUBSCRIPTION_SYNC__SYNC__PROVISIONING_PROVIDERS",
    ];

    /// Helper to set environment variables for testing
    fn set_minimal_env() {
        env::set_var("SUBSCRIPTION_SYNC__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("SUBSCRIPTION_SYNC__PAYMENT__STRIPE__API_KEY", "sk_test_xxx");
        env::set_var("SUBSCRIPTION_SYNC__PAYMENT__STRIPE__WEBHOOK_SECRET", "whsec_xxx");
    }

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.stripe.api_key, "sk_test_xxx");
        assert!(!config.payment.mercadopago.is_enabled());
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.sync.write_policy, WritePolicy::LastWriteWins);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SYNC__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_reject_stale_policy() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SYNC__SYNC__WRITE_POLICY", "reject_stale");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.sync.write_policy, WritePolicy::RejectStale);
    }

    #[test]
    fn test_provisioning_provider_must_be_configured() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("SUBSCRIPTION_SYNC__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("SUBSCRIPTION_SYNC__PAYMENT__MERCADOPAGO__ACCESS_TOKEN", "APP_USR-token");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::ProviderNotConfigured("stripe".to_string()))
        );
    }

    #[test]
    fn test_mercadopago_cannot_provision() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SYNC__PAYMENT__MERCADOPAGO__ACCESS_TOKEN", "APP_USR-token");
        env::set_var("SUBSCRIPTION_SYNC__SYNC__PROVISIONING_PROVIDERS", "mercadopago");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::ProviderCannotProvision("mercadopago".to_string()))
        );
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SYNC__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }
}

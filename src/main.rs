//! Subscription Sync server
//!
//! Receives provider webhooks, serves the access gate, and provisions new
//! accounts against the configured billing providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_sync::adapters::http::{self, InternalToken, SubscriptionAppState};
use subscription_sync::adapters::mercadopago::{
    MercadoPagoClient, MercadoPagoClientConfig, MercadoPagoEventAdapter,
};
use subscription_sync::adapters::postgres::{self, PostgresSubscriptionStore};
use subscription_sync::adapters::stripe::{
    StripeClientConfig, StripeCustomerClient, StripeEventAdapter, StripeSignatureVerifier,
};
use subscription_sync::config::AppConfig;
use subscription_sync::domain::subscription::{Provider, StatusNormalizer};
use subscription_sync::ports::{BillingProvider, ProviderEventAdapter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!("Starting subscription-sync v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    let store = Arc::new(PostgresSubscriptionStore::new(pool));

    let mut event_adapters: HashMap<Provider, Arc<dyn ProviderEventAdapter>> = HashMap::new();
    let mut billing: HashMap<Provider, Arc<dyn BillingProvider>> = HashMap::new();

    let stripe = &config.payment.stripe;
    if stripe.is_enabled() {
        let verifier = StripeSignatureVerifier::new(SecretString::new(stripe.webhook_secret.clone()))
            .with_tolerance(stripe.signature_tolerance_secs);
        event_adapters.insert(
            Provider::Stripe,
            Arc::new(StripeEventAdapter::new(verifier).with_require_livemode(stripe.require_livemode)),
        );

        let client = StripeCustomerClient::new(
            StripeClientConfig::new(SecretString::new(stripe.api_key.clone()))
                .with_base_url(stripe.api_base_url.clone()),
        )?;
        billing.insert(Provider::Stripe, Arc::new(client));
        tracing::info!(live_mode = stripe.is_live_mode(), "Stripe enabled");
    }

    let mp = &config.payment.mercadopago;
    if mp.is_enabled() {
        let client = Arc::new(MercadoPagoClient::new(
            MercadoPagoClientConfig::new(SecretString::new(mp.access_token.clone()))
                .with_base_url(mp.api_base_url.clone())
                .with_timeout(Duration::from_secs(mp.request_timeout_secs)),
        )?);
        let base_url = client.api_base_url().to_string();
        event_adapters.insert(
            Provider::MercadoPago,
            Arc::new(MercadoPagoEventAdapter::new(client, base_url)),
        );
        tracing::info!("Mercado Pago enabled");
    }

    let provisioning_providers: Vec<Arc<dyn BillingProvider>> = config
        .sync
        .provisioning_providers()?
        .into_iter()
        .filter_map(|p| billing.get(&p).cloned())
        .collect();
    let billing_providers: Vec<Arc<dyn BillingProvider>> = Provider::ALL
        .iter()
        .filter_map(|p| billing.get(p).cloned())
        .collect();

    let token = InternalToken::new(config.server.internal_token());
    if config.server.internal_token().is_none() {
        tracing::warn!("No internal API token configured; /internal routes are locked");
    }

    let state = SubscriptionAppState {
        store,
        normalizer: Arc::new(StatusNormalizer::default()),
        event_adapters: Arc::new(event_adapters),
        provisioning_providers,
        billing_providers,
        write_policy: config.sync.write_policy,
    };

    let app = http::app(state, token, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, write_policy = ?config.sync.write_policy, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

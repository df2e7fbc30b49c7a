//! HTTP handlers for subscription endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{
    CheckAccessHandler, CheckAccessQuery, HandleProviderWebhookCommand,
    HandleProviderWebhookHandler, ProvisionAccountCommand, ProvisionAccountHandler,
    ProvisioningError, ReconcileCustomersHandler,
};
use crate::domain::foundation::AccountId;
use crate::domain::subscription::{Provider, StatusNormalizer, WebhookError, WritePolicy};
use crate::ports::{BillingProvider, InboundWebhook, ProviderEventAdapter, SubscriptionStore};

use super::dto::{
    ErrorResponse, HealthResponse, ProvisionAccountRequest, ProvisionAccountResponse,
    ReconciliationResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub normalizer: Arc<StatusNormalizer>,
    pub event_adapters: Arc<HashMap<Provider, Arc<dyn ProviderEventAdapter>>>,
    /// Providers that get a customer at provisioning; the first is primary.
    pub provisioning_providers: Vec<Arc<dyn BillingProvider>>,
    /// Every configured provider, swept by reconciliation.
    pub billing_providers: Vec<Arc<dyn BillingProvider>>,
    pub write_policy: WritePolicy,
}

impl SubscriptionAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self, provider: Provider) -> Option<HandleProviderWebhookHandler> {
        self.event_adapters.get(&provider).map(|adapter| {
            HandleProviderWebhookHandler::new(
                adapter.clone(),
                self.normalizer.clone(),
                self.store.clone(),
                self.write_policy,
            )
        })
    }

    pub fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.store.clone())
    }

    pub fn provision_handler(&self) -> ProvisionAccountHandler {
        ProvisionAccountHandler::new(self.provisioning_providers.clone(), self.store.clone())
    }

    pub fn reconcile_handler(&self) -> ReconcileCustomersHandler {
        ReconcileCustomersHandler::new(self.billing_providers.clone(), self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Handle Stripe events
pub async fn handle_stripe_webhook(
    State(state): State<SubscriptionAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    receive(state, Provider::Stripe, headers, body).await
}

/// POST /webhooks/mercadopago - Handle Mercado Pago notifications
pub async fn handle_mercadopago_webhook(
    State(state): State<SubscriptionAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    receive(state, Provider::MercadoPago, headers, body).await
}

async fn receive(
    state: SubscriptionAppState,
    provider: Provider,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    let handler = state
        .webhook_handler(provider)
        .ok_or(WebhookApiError::ProviderDisabled(provider))?;

    let cmd = HandleProviderWebhookCommand {
        webhook: inbound_webhook(&headers, body),
    };

    let receipt = handler.handle(cmd).await?;
    Ok(Json(WebhookAckResponse::from(receipt)))
}

fn inbound_webhook(headers: &HeaderMap, body: Bytes) -> InboundWebhook {
    headers
        .iter()
        .fold(InboundWebhook::new(body.to_vec()), |webhook, (name, value)| {
            match value.to_str() {
                Ok(v) => webhook.with_header(name.as_str(), v),
                Err(_) => webhook,
            }
        })
}

// ════════════════════════════════════════════════════════════════════════════════
// Internal Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /internal/accounts/:account_id/access - Access gate for one account
pub async fn check_access(
    State(state): State<SubscriptionAppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, InternalApiError> {
    let account_id = AccountId::new(account_id)
        .map_err(|e| InternalApiError::BadRequest(e.to_string()))?;

    let result = state
        .check_access_handler()
        .handle(CheckAccessQuery { account_id })
        .await;

    Ok(Json(result))
}

/// POST /internal/accounts - Provision a newly registered account
pub async fn provision_account(
    State(state): State<SubscriptionAppState>,
    Json(request): Json<ProvisionAccountRequest>,
) -> Result<impl IntoResponse, InternalApiError> {
    let account_id = AccountId::new(request.account_id)
        .map_err(|e| InternalApiError::BadRequest(e.to_string()))?;

    let cmd = ProvisionAccountCommand {
        account_id,
        email: request.email,
        name: request.name,
    };

    let result = state.provision_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(ProvisionAccountResponse::from(result))))
}

/// POST /internal/reconciliation - Sweep providers for unmapped customers
pub async fn run_reconciliation(State(state): State<SubscriptionAppState>) -> impl IntoResponse {
    let reports = state.reconcile_handler().handle().await;
    Json(ReconciliationResponse { reports })
}

/// GET /health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Webhook errors rendered for the provider.
///
/// The status code decides redelivery, so acknowledged errors still get a
/// 200 with an acknowledgement body.
#[derive(Debug)]
pub enum WebhookApiError {
    Pipeline(WebhookError),
    ProviderDisabled(Provider),
}

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self::Pipeline(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        match self {
            WebhookApiError::ProviderDisabled(provider) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    "PROVIDER_DISABLED",
                    format!("{} is not configured", provider),
                )),
            )
                .into_response(),
            WebhookApiError::Pipeline(err) => {
                let status = err.status_code();
                if status.is_success() {
                    return (status, Json(WebhookAckResponse::for_error(&err))).into_response();
                }
                // Internal details stay in the logs.
                let message = match &err {
                    WebhookError::Storage(_) => "Internal error".to_string(),
                    WebhookError::UpstreamUnavailable(_) => {
                        "Provider API unavailable, retry later".to_string()
                    }
                    other => other.to_string(),
                };
                (status, Json(ErrorResponse::new(err.code(), message))).into_response()
            }
        }
    }
}

/// Errors from internal endpoints.
#[derive(Debug)]
pub enum InternalApiError {
    BadRequest(String),
    Provisioning(ProvisioningError),
}

impl From<ProvisioningError> for InternalApiError {
    fn from(err: ProvisioningError) -> Self {
        Self::Provisioning(err)
    }
}

impl IntoResponse for InternalApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            InternalApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg.clone())
            }
            InternalApiError::Provisioning(err) => match err {
                ProvisioningError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg.clone())
                }
                ProvisioningError::AlreadyProvisioned(_) => {
                    (StatusCode::CONFLICT, "ALREADY_PROVISIONED", err.to_string())
                }
                ProvisioningError::NoProviders => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVISIONING_DISABLED",
                    err.to_string(),
                ),
                ProvisioningError::Provider { .. } if err.is_retryable() => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_UNAVAILABLE",
                    err.to_string(),
                ),
                ProvisioningError::Provider { .. } => {
                    (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", err.to_string())
                }
                ProvisioningError::Store { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal error".to_string(),
                ),
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

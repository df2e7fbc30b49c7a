//! Payment providers known to the synchronization pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// An external billing provider acting as a system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Card-based recurring billing; signed, self-contained events.
    Stripe,
    /// Regional recurring billing; ID-only notifications.
    #[serde(alias = "mercado_pago")]
    MercadoPago,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Stripe, Provider::MercadoPago];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::MercadoPago => "mercadopago",
        }
    }

    /// Whether a customer created at provisioning is the id this provider's
    /// later events are keyed by.
    ///
    /// Mercado Pago preapprovals carry the payer's user id, never a customer
    /// created through `/v1/customers`, so its mapping comes from the first
    /// event's `external_reference` instead.
    pub fn supports_provisioning(&self) -> bool {
        match self {
            Provider::Stripe => true,
            Provider::MercadoPago => false,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Provider::Stripe),
            "mercadopago" | "mercado_pago" => Ok(Provider::MercadoPago),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

//! Identifier value objects.
//!
//! Accounts are issued by the external authentication system, and customer
//! ids by the payment providers, so both are opaque strings here.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ValidationError;

const MAX_ID_LEN: usize = 255;

/// Opaque identifier of an account in the authentication system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new AccountId, rejecting blank or oversized values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        if trimmed.len() > MAX_ID_LEN {
            return Err(ValidationError::invalid_format(
                "account_id",
                format!("must be at most {} characters", MAX_ID_LEN),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

/// Customer identifier issued by a payment provider.
///
/// Only unique within its provider; pair it with a [`Provider`](crate::domain::subscription::Provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderCustomerId(String);

impl ProviderCustomerId {
    /// Creates a new ProviderCustomerId, returning error if blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("provider_customer_id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderCustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_opaque_strings() {
        let id = AccountId::new("8f14e45f-ceea-467f-a8b0-3c6a1e0d5b77").unwrap();
        assert_eq!(id.as_str(), "8f14e45f-ceea-467f-a8b0-3c6a1e0d5b77");
    }

    #[test]
    fn account_id_trims_surrounding_whitespace() {
        let id = AccountId::new("  acc_42 ").unwrap();
        assert_eq!(id.as_str(), "acc_42");
    }

    #[test]
    fn account_id_rejects_blank() {
        match AccountId::new("   ") {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "account_id"),
            other => panic!("expected EmptyField, got {:?}", other),
        }
    }

    #[test]
    fn account_id_rejects_oversized() {
        let long = "a".repeat(MAX_ID_LEN + 1);
        assert!(AccountId::new(long).is_err());
    }

    #[test]
    fn account_id_deserializes_through_validation() {
        let ok: AccountId = serde_json::from_str("\"acc_1\"").unwrap();
        assert_eq!(ok.as_str(), "acc_1");

        let err = serde_json::from_str::<AccountId>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn provider_customer_id_rejects_blank() {
        assert!(ProviderCustomerId::new("").is_err());
        assert_eq!(ProviderCustomerId::new("cus_123").unwrap().to_string(), "cus_123");
    }
}

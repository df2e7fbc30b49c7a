//! Stripe webhook signature verification.
//!
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...][,v0=<hex>]`
//!
//! The v1 signature is HMAC-SHA256 of `"{t}.{raw body}"` keyed by the
//! endpoint's signing secret. Several v1 entries appear while a secret is
//! being rolled; any one matching is enough.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::subscription::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a signed delivery.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum accepted clock skew for timestamps in the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses the header. Unknown keys and the legacy `v0` scheme are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` if the timestamp or every v1 signature is missing,
    /// or a value is malformed.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(WebhookError::InvalidSignature)?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| WebhookError::InvalidSignature)?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| WebhookError::InvalidSignature)?);
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifies Stripe webhook signatures against one signing secret.
pub struct StripeSignatureVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeSignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies `payload` against a raw `Stripe-Signature` header value.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(header)?;
        self.verify_at(payload, &header, chrono::Utc::now().timestamp())
    }

    /// Verification against an explicit clock.
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), WebhookError> {
        let age = now
            .checked_sub(header.timestamp)
            .ok_or(WebhookError::InvalidTimestamp)?;
        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        let expected = compute_signature(self.secret.expose_secret(), header.timestamp, payload)?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a `Stripe-Signature` header value for a payload.
///
/// Used to replay captured events against a local receiver.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_700_000_000;

    fn verifier() -> StripeSignatureVerifier {
        StripeSignatureVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn signed(payload: &str, timestamp: i64) -> SignatureHeader {
        SignatureHeader::parse(&signature_header(SECRET, timestamp, payload.as_bytes()).unwrap()).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Header Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_timestamp_and_signature() {
        let header = SignatureHeader::parse("t=1614556800,v1=abcdef0123456789").unwrap();
        assert_eq!(header.timestamp, 1614556800);
        assert_eq!(header.v1_signatures, vec![hex::decode("abcdef0123456789").unwrap()]);
    }

    #[test]
    fn collects_multiple_v1_signatures() {
        let header = SignatureHeader::parse("t=1,v1=aa,v1=bb,v0=cc").unwrap();
        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn ignores_unknown_keys_and_spaces() {
        let header = SignatureHeader::parse("t=1, v1=aa, scheme=x").unwrap();
        assert_eq!(header.timestamp, 1);
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert!(matches!(
            SignatureHeader::parse("v1=abcdef"),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_missing_v1() {
        assert!(SignatureHeader::parse("t=1,v0=abcdef").is_err());
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(SignatureHeader::parse("t=1,v1=not-hex").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(SignatureHeader::parse("garbage").is_err());
        assert!(SignatureHeader::parse("").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_signature() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = signed(payload, NOW);
        assert!(verifier().verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn accepts_when_any_v1_matches() {
        let payload = r#"{"id":"evt_1"}"#;
        let mut header = signed(payload, NOW);
        header.v1_signatures.insert(0, vec![0u8; 32]);
        assert!(verifier().verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let header = signed(r#"{"id":"evt_1"}"#, NOW);
        let result = verifier().verify_at(br#"{"id":"evt_2"}"#, &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = SignatureHeader::parse(&signature_header("whsec_other", NOW, payload.as_bytes()).unwrap()).unwrap();
        assert!(matches!(
            verifier().verify_at(payload.as_bytes(), &header, NOW),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_old_timestamp() {
        let payload = "{}";
        let header = signed(payload, NOW - 301);
        assert!(matches!(
            verifier().verify_at(payload.as_bytes(), &header, NOW),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn tolerance_is_configurable() {
        let payload = "{}";
        let header = signed(payload, NOW - 301);
        let lenient = verifier().with_tolerance(600);
        assert!(lenient.verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn allows_small_clock_skew() {
        let payload = "{}";
        let header = signed(payload, NOW + 30);
        assert!(verifier().verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn rejects_far_future_timestamp() {
        let payload = "{}";
        let header = signed(payload, NOW + 120);
        assert!(matches!(
            verifier().verify_at(payload.as_bytes(), &header, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn verify_uses_wall_clock() {
        let payload = r#"{"id":"evt_now"}"#;
        let now = chrono::Utc::now().timestamp();
        let header = signature_header(SECRET, now, payload.as_bytes()).unwrap();
        assert!(verifier().verify(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        let min = format!("t={},v1=00", i64::MIN);
        assert!(matches!(
            verifier().verify(b"{}", &min),
            Err(WebhookError::InvalidTimestamp)
        ));

        let max = SignatureHeader::parse(&format!("t={},v1=00", i64::MAX)).unwrap();
        assert!(matches!(
            verifier().verify_at(b"{}", &max, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));

        let min = SignatureHeader::parse(&format!("t={},v1=00", i64::MIN)).unwrap();
        assert!(matches!(
            verifier().verify_at(b"{}", &min, i64::MAX),
            Err(WebhookError::InvalidTimestamp)
        ));
    }
}

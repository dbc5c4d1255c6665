//! Webhook checksum verification.
//!
//! The gateway signs each notification with an HMAC-SHA256 checksum of the
//! raw body, hex-encoded in the signature header. A missing or mismatched
//! checksum is a hard rejection with no state mutation, as is a body that
//! fails to parse.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::WebhookNotification;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while verifying an inbound notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Signature is not valid hex: {0}")]
    MalformedSignature(String),

    #[error("Checksum mismatch")]
    InvalidSignature,

    #[error("Payload is not a valid notification: {0}")]
    ParseError(String),
}

/// Verifies gateway notifications before they are trusted.
pub struct WebhookVerifier {
    checksum_secret: SecretString,
}

impl WebhookVerifier {
    /// Creates a verifier with the shared checksum secret.
    pub fn new(checksum_secret: impl Into<String>) -> Self {
        Self {
            checksum_secret: SecretString::new(checksum_secret.into()),
        }
    }

    /// Verifies the checksum and parses the body into a notification.
    ///
    /// # Errors
    ///
    /// - `MissingSignature` / `MalformedSignature` - header absent or not hex
    /// - `InvalidSignature` - checksum mismatch
    /// - `ParseError` - body is not a structurally valid notification
    pub fn verify(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookNotification, WebhookError> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        let provided = hex::decode(signature.trim())
            .map_err(|e| WebhookError::MalformedSignature(e.to_string()))?;

        let expected = self.compute_checksum(raw_body);
        if !constant_time_compare(&expected, &provided) {
            tracing::warn!("Webhook checksum mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        serde_json::from_slice(raw_body).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn compute_checksum(&self, raw_body: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.checksum_secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key size");
        mac.update(raw_body);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time comparison to avoid leaking the expected checksum through
/// timing differences.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex checksum a legitimate gateway would send.
///
/// Used by tests and by tooling that replays notifications.
pub fn sign_body(secret: &str, raw_body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "cs_test_secret_42";

    fn valid_body() -> &'static [u8] {
        br#"{"orderCode":1700000010,"resultCode":"00","reference":"R7"}"#
    }

    #[test]
    fn accepts_correctly_signed_body() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let body = valid_body();
        let sig = sign_body(TEST_SECRET, body);

        let note = verifier.verify(body, Some(&sig)).unwrap();

        assert_eq!(note.order_code.as_i64(), 1_700_000_010);
        assert!(note.is_success());
    }

    #[test]
    fn rejects_missing_signature() {
        let verifier = WebhookVerifier::new(TEST_SECRET);

        let result = verifier.verify(valid_body(), None);

        assert_eq!(result, Err(WebhookError::MissingSignature));
    }

    #[test]
    fn rejects_non_hex_signature() {
        let verifier = WebhookVerifier::new(TEST_SECRET);

        let result = verifier.verify(valid_body(), Some("not-hex!"));

        assert!(matches!(result, Err(WebhookError::MalformedSignature(_))));
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = WebhookVerifier::new("some_other_secret");
        let body = valid_body();
        let sig = sign_body(TEST_SECRET, body);

        let result = verifier.verify(body, Some(&sig));

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let sig = sign_body(TEST_SECRET, valid_body());
        let tampered = br#"{"orderCode":1700000010,"resultCode":"00","reference":"EVIL"}"#;

        let result = verifier.verify(tampered, Some(&sig));

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_signed_but_malformed_payload() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let body = b"not json at all";
        let sig = sign_body(TEST_SECRET, body);

        let result = verifier.verify(body, Some(&sig));

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn constant_time_compare_handles_length_mismatch() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2]));
        assert!(constant_time_compare(&[9, 9], &[9, 9]));
    }
}

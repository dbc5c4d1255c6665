//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Gateway API key
    pub api_key: SecretString,

    /// Shared secret used to verify webhook checksums
    pub checksum_secret: SecretString,

    /// Base URL of the gateway REST API
    pub api_base_url: String,

    /// Base URL checkout pages live under
    pub checkout_base_url: String,

    /// ISO currency code orders are placed in
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Redirect after successful checkout
    pub return_url: String,

    /// Redirect after abandoned checkout
    pub cancel_url: String,

    /// Total attempts per gateway call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PaymentConfig {
    /// Validate payment gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT_API_KEY"));
        }
        if self.checksum_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT_CHECKSUM_SECRET"));
        }
        for url in [
            &self.api_base_url,
            &self.checkout_base_url,
            &self.return_url,
            &self.cancel_url,
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidGatewayUrl);
            }
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryBudget);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

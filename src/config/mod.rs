//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `SPONSORBRIDGE`
//! prefix and `__` as the nesting separator, e.g.
//! `SPONSORBRIDGE__DATABASE__URL` or `SPONSORBRIDGE__PAYMENT__API_KEY`.

mod database;
mod error;
mod payment;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment gateway configuration
    pub payment: PaymentConfig,

    /// How often the subscription expiry sweep runs, in seconds
    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_sweep_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file first if one is present, then reads variables
    /// with the `SPONSORBRIDGE` prefix.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SPONSORBRIDGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }
}

fn default_expiry_sweep_secs() -> u64 {
    3600
}

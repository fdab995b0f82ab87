//! Configuration module with business-specific sub-modules
//!
//! - `auth` - token lifetimes, rotation deadline and RSA key locations
//! - `database` - connection pool settings and token table names
//! - `environment` - environment detection and logging configuration

pub mod auth;
pub mod database;
pub mod environment;

use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::str::FromStr;

pub use auth::TokenConfig;
pub use database::{DatabaseConfig, TableNames};
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token issuance and rotation configuration
    pub token: TokenConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            token: TokenConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first when present;
    /// variables already set in the environment take precedence over it.
    /// A variable that is set but malformed is an error, never a silent
    /// fallback to the default.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();

        let environment = Environment::from_env()?;
        Ok(Self {
            environment,
            database: DatabaseConfig::from_env()?,
            token: TokenConfig::from_env()?,
            logging: LoggingConfig::from_env(environment)?,
        })
    }

    /// Validate every sub-configuration, returning the first problem found
    pub fn validate(&self) -> Result<(), String> {
        self.token.validate()?;
        self.database.validate()?;
        Ok(())
    }
}

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: {:?}", key, raw)),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(format!("{} is not valid unicode", key)),
    }
}

/// Read `key` from the environment as a string, falling back to `default`.
pub(crate) fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

//! Token issuance and rotation configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::{env_or, env_string_or};

/// Scopes granted when a sign-in does not request any explicitly
pub const DEFAULT_SCOPES: &str = "[*]";

/// Longest accepted token lifetime, ten years in seconds
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// Settings for the access/refresh token pair lifecycle
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: u64,

    /// Upper bound for a whole refresh rotation, in milliseconds
    #[serde(default = "default_rotation_timeout_ms")]
    pub rotation_timeout_ms: u64,

    /// PEM file holding the RSA private key
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,

    /// PEM file holding the RSA public key
    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,

    /// Scope string attached to freshly signed-in pairs
    #[serde(default = "default_scopes")]
    pub default_scopes: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: default_access_token_ttl(),
            refresh_token_ttl: default_refresh_token_ttl(),
            rotation_timeout_ms: default_rotation_timeout_ms(),
            private_key_path: default_private_key_path(),
            public_key_path: default_public_key_path(),
            default_scopes: default_scopes(),
        }
    }
}

impl TokenConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            access_token_ttl: env_or("SSO_TOKEN_TTL_SECS", default_access_token_ttl())?,
            refresh_token_ttl: env_or("SSO_REFRESH_TTL_SECS", default_refresh_token_ttl())?,
            rotation_timeout_ms: env_or("SSO_ROTATION_TIMEOUT_MS", default_rotation_timeout_ms())?,
            private_key_path: PathBuf::from(env_string_or(
                "SSO_PRIVATE_KEY_PATH",
                "./storage/secret/oauth-private.key",
            )),
            public_key_path: PathBuf::from(env_string_or(
                "SSO_PUBLIC_KEY_PATH",
                "./storage/secret/oauth-public.key",
            )),
            default_scopes: env_string_or("SSO_DEFAULT_SCOPES", DEFAULT_SCOPES),
        })
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl)
    }

    pub fn rotation_timeout(&self) -> Duration {
        Duration::from_millis(self.rotation_timeout_ms)
    }

    /// Set both token lifetimes in seconds
    pub fn with_ttls(mut self, access_secs: u64, refresh_secs: u64) -> Self {
        self.access_token_ttl = access_secs;
        self.refresh_token_ttl = refresh_secs;
        self
    }

    /// Set the rotation deadline in milliseconds
    pub fn with_rotation_timeout_ms(mut self, millis: u64) -> Self {
        self.rotation_timeout_ms = millis;
        self
    }

    /// Set the key file locations
    pub fn with_key_paths(mut self, private: impl Into<PathBuf>, public: impl Into<PathBuf>) -> Self {
        self.private_key_path = private.into();
        self.public_key_path = public.into();
        self
    }

    /// Check the lifetimes are usable.
    ///
    /// A refresh token must outlive the access token it is paired with,
    /// otherwise clients could never renew a session before it lapses.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_token_ttl == 0 {
            return Err("access token TTL must be greater than zero".to_string());
        }
        if self.refresh_token_ttl > MAX_TOKEN_TTL_SECS {
            return Err(format!(
                "refresh token TTL ({}s) exceeds the maximum of {}s",
                self.refresh_token_ttl, MAX_TOKEN_TTL_SECS
            ));
        }
        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(format!(
                "refresh token TTL ({}s) must exceed access token TTL ({}s)",
                self.refresh_token_ttl, self.access_token_ttl
            ));
        }
        if self.rotation_timeout_ms == 0 {
            return Err("rotation timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn default_access_token_ttl() -> u64 {
    3600 // 1 hour
}

fn default_refresh_token_ttl() -> u64 {
    86400 // 1 day
}

fn default_rotation_timeout_ms() -> u64 {
    5000
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("./storage/secret/oauth-private.key")
}

fn default_public_key_path() -> PathBuf {
    PathBuf::from("./storage/secret/oauth-public.key")
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

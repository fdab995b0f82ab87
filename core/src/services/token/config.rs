//! Configuration for the token services

use std::time::Duration;

use sso_shared::config::auth::{TokenConfig, DEFAULT_SCOPES};

/// Runtime settings shared by the issuer and the rotator
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Deadline for one complete refresh rotation
    pub rotation_timeout: Duration,
    /// Scopes granted at sign-in
    pub default_scopes: String,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::from_secs(3600),
            refresh_token_ttl: Duration::from_secs(86400),
            rotation_timeout: Duration::from_secs(5),
            default_scopes: DEFAULT_SCOPES.to_string(),
        }
    }
}

impl From<&TokenConfig> for TokenServiceConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            access_token_ttl: config.access_ttl(),
            refresh_token_ttl: config.refresh_ttl(),
            rotation_timeout: config.rotation_timeout(),
            default_scopes: config.default_scopes.clone(),
        }
    }
}

impl TokenServiceConfig {
    pub fn with_rotation_timeout(mut self, timeout: Duration) -> Self {
        self.rotation_timeout = timeout;
        self
    }

    pub fn with_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_ttl = access;
        self.refresh_token_ttl = refresh;
        self
    }
}

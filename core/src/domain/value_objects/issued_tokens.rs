//! Token pair handed back to a client.

use serde::{Deserialize, Serialize};

/// Freshly issued access/refresh pair as returned to the caller.
///
/// `access_token` is an HS512 JWT signed with the client's secret;
/// `refresh_token` is an opaque RSA-OAEP ciphertext only this service can read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedTokens {
    pub access_token: String,

    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// Access token expiry, unix seconds
    pub expires_at: i64,

    /// Scope string granted to the pair
    pub scopes: String,
}

impl IssuedTokens {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        expires_at: i64,
        scopes: impl Into<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            expires_at,
            scopes: scopes.into(),
        }
    }

    /// Token type reported to OAuth clients
    pub fn token_type(&self) -> &'static str {
        "Bearer"
    }
}

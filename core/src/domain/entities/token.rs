//! Token entities for the access/refresh pair lifecycle.

use serde::{Deserialize, Serialize};

/// Persisted record of an issued access token.
///
/// Only the identifier and its ownership are stored; the signed JWT itself
/// is handed to the client and never kept server side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Hex content hash, unique across all access tokens
    pub id: String,

    /// Owning user
    pub user_id: i64,

    /// Client the token was issued to
    pub client_id: String,

    /// Optional display name, unused by rotation
    pub name: Option<String>,

    /// Scope string granted to this token
    pub scopes: String,

    /// Whether the token has been revoked
    pub revoked: bool,

    /// Unix seconds
    pub created_at: i64,

    /// Unix seconds, bumped when the token is revoked
    pub updated_at: i64,

    /// Unix seconds
    pub expires_at: i64,
}

impl AccessToken {
    /// Creates a new, non-revoked access token record expiring `ttl_secs` after `now`
    pub fn new(
        id: String,
        user_id: i64,
        client_id: impl Into<String>,
        scopes: impl Into<String>,
        now: i64,
        ttl_secs: i64,
    ) -> Self {
        Self {
            id,
            user_id,
            client_id: client_id.into(),
            name: None,
            scopes: scopes.into(),
            revoked: false,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl_secs,
        }
    }

    /// Checks whether this token is owned by the given user and client
    pub fn belongs_to(&self, user_id: i64, client_id: &str) -> bool {
        self.user_id == user_id && self.client_id == client_id
    }
}

/// Persisted record of an issued refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Hex content hash, unique across all refresh tokens
    pub id: String,

    /// Access token this refresh token was issued alongside
    pub access_token_id: String,

    /// Whether the token has been revoked
    pub revoked: bool,

    /// Unix seconds
    pub expires_at: i64,
}

impl RefreshToken {
    pub fn new(id: String, access_token_id: impl Into<String>, expires_at: i64) -> Self {
        Self {
            id,
            access_token_id: access_token_id.into(),
            revoked: false,
            expires_at,
        }
    }
}

/// Plaintext carried inside an encrypted refresh token.
///
/// The serialized field names are part of the wire format and must stay
/// stable for tokens already in circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPayload {
    pub client_id: String,

    pub token_refresh_id: String,

    pub token_access_id: String,

    pub scopes: String,

    pub user_id: i64,

    pub uuid: String,

    pub email: String,

    #[serde(rename = "exp_at")]
    pub expires_at: i64,
}

impl RefreshPayload {
    /// Strictly-less comparison: a payload is still usable in its final second
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// Claims signed into an access token JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Public user identifier
    pub uuid: String,

    pub email: String,

    pub client_id: String,

    pub scopes: String,

    /// Expiration timestamp (unix seconds)
    pub exp: i64,
}

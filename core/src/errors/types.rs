//! Error types for crypto, storage and token lifecycle operations
//!
//! Internal variants carry enough detail to log precisely. Callers outside
//! the service only ever see the collapsed [`PublicError`].

use thiserror::Error;

/// Failures of the signing and refresh-token encryption primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Malformed token encoding: {0}")]
    Decode(String),

    #[error("Decryption failed")]
    Crypto,

    #[error("Malformed token payload: {0}")]
    Parse(String),

    #[error("Key load failed: {0}")]
    KeyLoad(String),
}

/// Storage failures reported by token, client and user stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store operation timed out")]
    Timeout,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Token lifecycle errors
///
/// Variants split into two categories: validation failures, where the
/// presented token will never succeed, and retryable failures, where the
/// same request may work later.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid refresh token")]
    InvalidToken,

    #[error("Refresh token expired")]
    Expired,

    #[error("Token not found")]
    NotFound,

    #[error("Token revoked")]
    Revoked,

    #[error("Refresh token replay detected")]
    ReplayDetected,

    #[error("Client resolution failed: {0}")]
    ClientResolutionFailed(#[source] StoreError),

    #[error("Token persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),

    #[error("Token crypto failed: {0}")]
    CryptoFailed(#[from] CryptoError),

    #[error("Token rotation timed out")]
    Timeout,
}

impl TokenError {
    /// The presented token is unusable and retrying cannot help
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TokenError::InvalidToken
                | TokenError::Expired
                | TokenError::NotFound
                | TokenError::Revoked
                | TokenError::ReplayDetected
        )
    }

    /// The failure was environmental; the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TokenError::ClientResolutionFailed(_)
                | TokenError::PersistenceFailed(_)
                | TokenError::Timeout
        )
    }

    /// Collapse into the error a caller outside the service is allowed to see
    pub fn to_public(&self) -> PublicError {
        if self.is_validation() {
            PublicError::RefreshTokenInvalid
        } else if self.is_retryable() {
            PublicError::TemporarilyUnavailable
        } else {
            PublicError::Internal
        }
    }

    /// Stable label for structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::InvalidToken => "invalid_token",
            TokenError::Expired => "expired",
            TokenError::NotFound => "not_found",
            TokenError::Revoked => "revoked",
            TokenError::ReplayDetected => "replay_detected",
            TokenError::ClientResolutionFailed(_) => "client_resolution_failed",
            TokenError::PersistenceFailed(_) => "persistence_failed",
            TokenError::CryptoFailed(_) => "crypto_failed",
            TokenError::Timeout => "timeout",
        }
    }
}

/// Errors exposed to callers of the refresh flow.
///
/// A client cannot tell an expired token from a replayed or unknown one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicError {
    #[error("The refresh token is invalid")]
    RefreshTokenInvalid,

    #[error("The service is temporarily unavailable, try again later")]
    TemporarilyUnavailable,

    #[error("Internal server error")]
    Internal,
}

impl PublicError {
    /// OAuth-style error code
    pub fn code(&self) -> &'static str {
        match self {
            PublicError::RefreshTokenInvalid => "invalid_grant",
            PublicError::TemporarilyUnavailable => "temporarily_unavailable",
            PublicError::Internal => "server_error",
        }
    }
}

impl From<TokenError> for PublicError {
    fn from(err: TokenError) -> Self {
        err.to_public()
    }
}

//! Security events raised while handling refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of security-relevant incidents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// A refresh token that is no longer the newest in its lineage was presented
    RefreshReplay,
    /// A refresh token was consumed by a concurrent rotation first
    ConcurrentRotation,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::RefreshReplay => "refresh_replay",
            SecurityEventKind::ConcurrentRotation => "concurrent_rotation",
        }
    }
}

/// A single recorded incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub user_id: i64,
    pub client_id: String,
    pub access_token_id: String,
    pub refresh_token_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(
        kind: SecurityEventKind,
        user_id: i64,
        client_id: impl Into<String>,
        access_token_id: impl Into<String>,
        refresh_token_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            user_id,
            client_id: client_id.into(),
            access_token_id: access_token_id.into(),
            refresh_token_id: refresh_token_id.into(),
            occurred_at: Utc::now(),
        }
    }
}

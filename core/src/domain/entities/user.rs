//! User entity as seen by token issuance.

use serde::{Deserialize, Serialize};

/// A user who can sign in and hold token pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal numeric key, the owner of every token row
    pub id: i64,

    /// Public identifier embedded in tokens
    pub uuid: String,

    pub email: String,

    pub name: Option<String>,

    /// Credential hash owned by the authentication layer; never read here
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
}

impl User {
    pub fn new(id: i64, uuid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            uuid: uuid.into(),
            email: email.into(),
            name: None,
            password_hash: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Case-insensitive match on email or display name
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.email.eq_ignore_ascii_case(identifier)
            || self
                .name
                .as_deref()
                .map_or(false, |name| name.eq_ignore_ascii_case(identifier))
    }
}

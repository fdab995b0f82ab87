//! OAuth client entity.

use serde::{Deserialize, Serialize};

/// A registered application that tokens are issued to.
///
/// Each client signs its access tokens with its own secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,

    pub name: String,

    /// HMAC key for access token signatures
    pub secret: String,
}

impl Client {
    pub fn new(id: impl Into<String>, name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            secret: secret.into(),
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

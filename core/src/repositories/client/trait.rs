//! Client resolver trait for looking up OAuth clients.

use async_trait::async_trait;

use crate::domain::entities::client::Client;
use crate::errors::StoreError;

/// Resolves a client id to its registered record, including the signing secret
#[async_trait]
pub trait ClientResolver: Send + Sync {
    /// Look up a client by id
    ///
    /// # Returns
    /// * `Ok(Client)` - The registered client
    /// * `Err(StoreError::NotFound)` - No client with that id
    /// * `Err(StoreError::Database)` - Backend unavailable
    async fn get_client(&self, client_id: &str) -> Result<Client, StoreError>;
}

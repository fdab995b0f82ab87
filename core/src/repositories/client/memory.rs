//! In-memory client registry

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::client::Client;
use crate::errors::StoreError;

use super::r#trait::ClientResolver;

/// Client registry held in process memory
#[derive(Clone, Default)]
pub struct InMemoryClientRegistry {
    clients: Arc<RwLock<HashMap<String, Client>>>,
}

impl InMemoryClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with `clients`
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let map = clients
            .into_iter()
            .map(|client| (client.id.clone(), client))
            .collect();
        Self {
            clients: Arc::new(RwLock::new(map)),
        }
    }

    /// Add or replace a client
    pub async fn register(&self, client: Client) {
        self.clients.write().await.insert(client.id.clone(), client);
    }

    pub async fn remove(&self, client_id: &str) -> Option<Client> {
        self.clients.write().await.remove(client_id)
    }
}

#[async_trait]
impl ClientResolver for InMemoryClientRegistry {
    async fn get_client(&self, client_id: &str) -> Result<Client, StoreError> {
        self.clients
            .read()
            .await
            .get(client_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("client {}", client_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = InMemoryClientRegistry::new();
        registry.register(Client::new("web", "Web", "secret")).await;

        let client = registry.get_client("web").await.unwrap();
        assert_eq!(client.secret, "secret");

        registry.remove("web").await;
        assert!(registry.get_client("web").await.unwrap_err().is_not_found());
    }
}

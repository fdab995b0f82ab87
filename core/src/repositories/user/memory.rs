//! In-memory user store

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::user::User;
use crate::errors::StoreError;

use super::r#trait::UserStore;

/// User store held in process memory
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users.into_iter().collect())),
        }
    }

    /// Add a user, replacing any existing one with the same id
    pub async fn insert(&self, user: User) {
        let mut users = self.users.write().await;
        users.retain(|existing| existing.id != user.id);
        users.push(user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn login(&self, identifier: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .iter()
            .find(|user| user.matches_identifier(identifier))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", identifier)))
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user #{}", id)))
    }
}

//! In-memory token store for tests and single-process deployments

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::token::{AccessToken, RefreshToken};
use crate::errors::StoreError;

use super::r#trait::{RotationCommit, RotationOutcome, TokenStore};

#[derive(Debug, Clone)]
struct StoredRefresh {
    token: RefreshToken,
    // Insertion order, breaks `expires_at` ties within a lineage.
    seq: u64,
}

#[derive(Debug, Default)]
struct Tables {
    access: HashMap<String, AccessToken>,
    refresh: HashMap<String, StoredRefresh>,
    next_seq: u64,
}

impl Tables {
    fn insert_access(&mut self, token: &AccessToken) -> Result<(), StoreError> {
        if self.access.contains_key(&token.id) {
            return Err(StoreError::AlreadyExists(format!("access token {}", token.id)));
        }
        self.access.insert(token.id.clone(), token.clone());
        Ok(())
    }

    fn insert_refresh(&mut self, token: &RefreshToken) -> Result<(), StoreError> {
        if self.refresh.contains_key(&token.id) {
            return Err(StoreError::AlreadyExists(format!("refresh token {}", token.id)));
        }
        self.next_seq += 1;
        self.refresh.insert(
            token.id.clone(),
            StoredRefresh {
                token: token.clone(),
                seq: self.next_seq,
            },
        );
        Ok(())
    }

    fn find_refresh(&self, id: &str, access_token_id: &str) -> Option<&StoredRefresh> {
        self.refresh
            .get(id)
            .filter(|stored| stored.token.access_token_id == access_token_id)
    }

    fn owner_of(&self, refresh: &RefreshToken) -> Option<i64> {
        self.access
            .get(&refresh.access_token_id)
            .map(|access| access.user_id)
    }

    fn latest_for_lineage(&self, id: &str, access_token_id: &str) -> Option<&StoredRefresh> {
        let presented = self.find_refresh(id, access_token_id)?;
        let user_id = self.owner_of(&presented.token)?;

        self.refresh
            .values()
            .filter(|stored| self.owner_of(&stored.token) == Some(user_id))
            .max_by_key(|stored| (stored.token.expires_at, stored.seq))
    }
}

/// Token store backed by process memory.
///
/// All rotation checks and writes happen under one write lock, which gives
/// the same all-or-nothing behaviour a database transaction would.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored row, each list sorted by id
    pub async fn snapshot(&self) -> (Vec<AccessToken>, Vec<RefreshToken>) {
        let tables = self.tables.read().await;
        let mut access: Vec<AccessToken> = tables.access.values().cloned().collect();
        let mut refresh: Vec<RefreshToken> =
            tables.refresh.values().map(|s| s.token.clone()).collect();
        access.sort_by(|a, b| a.id.cmp(&b.id));
        refresh.sort_by(|a, b| a.id.cmp(&b.id));
        (access, refresh)
    }

    /// Count pairs for a user where neither half is revoked
    pub async fn active_pair_count(&self, user_id: i64) -> usize {
        let tables = self.tables.read().await;
        tables
            .refresh
            .values()
            .filter(|stored| !stored.token.revoked)
            .filter(|stored| {
                tables
                    .access
                    .get(&stored.token.access_token_id)
                    .map_or(false, |access| access.user_id == user_id && !access.revoked)
            })
            .count()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn create_access_token(&self, token: &AccessToken) -> Result<String, StoreError> {
        let mut tables = self.tables.write().await;
        tables.insert_access(token)?;
        Ok(token.id.clone())
    }

    async fn access_token_exists(
        &self,
        id: &str,
        user_id: i64,
        client_id: &str,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .access
            .get(id)
            .map_or(false, |token| token.belongs_to(user_id, client_id)))
    }

    async fn revoke_access_token(
        &self,
        id: &str,
        user_id: i64,
        client_id: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.access.get_mut(id) {
            Some(token) if token.belongs_to(user_id, client_id) && !token.revoked => {
                token.revoked = true;
                token.updated_at = Utc::now().timestamp();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<String, StoreError> {
        let mut tables = self.tables.write().await;
        tables.insert_refresh(token)?;
        Ok(token.id.clone())
    }

    async fn get_refresh_token(
        &self,
        id: &str,
        access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        let tables = self.tables.read().await;
        tables
            .find_refresh(id, access_token_id)
            .map(|stored| stored.token.clone())
            .ok_or_else(|| StoreError::NotFound(format!("refresh token {}", id)))
    }

    async fn get_latest_refresh_token_for_lineage(
        &self,
        presented_id: &str,
        presented_access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        let tables = self.tables.read().await;
        tables
            .latest_for_lineage(presented_id, presented_access_token_id)
            .map(|stored| stored.token.clone())
            .ok_or_else(|| StoreError::NotFound(format!("lineage of refresh token {}", presented_id)))
    }

    async fn revoke_refresh_token(
        &self,
        id: &str,
        access_token_id: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.refresh.get_mut(id) {
            Some(stored) if stored.token.access_token_id == access_token_id && !stored.token.revoked => {
                stored.token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_token_pair(
        &self,
        access: &AccessToken,
        refresh: &RefreshToken,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.access.contains_key(&access.id) {
            return Err(StoreError::AlreadyExists(format!("access token {}", access.id)));
        }
        if tables.refresh.contains_key(&refresh.id) {
            return Err(StoreError::AlreadyExists(format!("refresh token {}", refresh.id)));
        }
        tables.insert_access(access)?;
        tables.insert_refresh(refresh)?;
        Ok(())
    }

    async fn rotate_token_pair(&self, commit: &RotationCommit) -> Result<RotationOutcome, StoreError> {
        let presented = &commit.presented;
        let mut tables = self.tables.write().await;

        let current = match tables.find_refresh(&presented.refresh_token_id, &presented.access_token_id) {
            Some(stored) => stored.token.clone(),
            None => return Ok(RotationOutcome::Missing),
        };
        if current.revoked {
            return Ok(RotationOutcome::AlreadyRevoked);
        }

        match tables.latest_for_lineage(&presented.refresh_token_id, &presented.access_token_id) {
            Some(latest) if latest.token.id == current.id => {}
            Some(_) => return Ok(RotationOutcome::Superseded),
            None => return Ok(RotationOutcome::Missing),
        }

        match tables.access.get(&presented.access_token_id) {
            Some(access) if access.belongs_to(presented.user_id, &presented.client_id) => {
                if access.revoked {
                    return Ok(RotationOutcome::AlreadyRevoked);
                }
            }
            _ => return Ok(RotationOutcome::Missing),
        }

        // Every check passed; reject id collisions before the first write.
        if tables.access.contains_key(&commit.access.id) {
            return Err(StoreError::AlreadyExists(format!("access token {}", commit.access.id)));
        }
        if tables.refresh.contains_key(&commit.refresh.id) {
            return Err(StoreError::AlreadyExists(format!("refresh token {}", commit.refresh.id)));
        }

        let now = Utc::now().timestamp();
        if let Some(access) = tables.access.get_mut(&presented.access_token_id) {
            access.revoked = true;
            access.updated_at = now;
        }
        if let Some(stored) = tables.refresh.get_mut(&presented.refresh_token_id) {
            stored.token.revoked = true;
        }
        tables.insert_access(&commit.access)?;
        tables.insert_refresh(&commit.refresh)?;

        Ok(RotationOutcome::Rotated)
    }
}

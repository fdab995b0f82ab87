//! Token store trait defining the interface for access/refresh token persistence.

use async_trait::async_trait;

use crate::domain::entities::token::{AccessToken, RefreshToken};
use crate::errors::StoreError;

/// Identity of the pair a client presented for rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedPair {
    pub refresh_token_id: String,
    pub access_token_id: String,
    pub user_id: i64,
    pub client_id: String,
}

/// Everything a rotation needs to apply in one atomic step:
/// revoke the presented pair and insert its replacement.
#[derive(Debug, Clone)]
pub struct RotationCommit {
    pub presented: PresentedPair,
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

/// Result of an atomic rotation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Old pair revoked, new pair inserted
    Rotated,
    /// The presented pair was already revoked, usually by a concurrent rotation
    AlreadyRevoked,
    /// A newer refresh token exists in the lineage
    Superseded,
    /// The presented refresh or access token no longer exists
    Missing,
}

/// Store trait for token pair persistence
///
/// Implementations must not delete rows: revoked tokens stay behind as the
/// audit trail that makes replay detection possible.
///
/// # Lineage
/// Every refresh token belongs to the lineage of the user owning its access
/// token. The newest refresh token in that lineage (by `expires_at`, ties
/// broken by insertion order) is the only one that may be rotated.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a new access token row
    ///
    /// # Returns
    /// * `Ok(String)` - The stored token id
    /// * `Err(StoreError::AlreadyExists)` - The id collides with an existing row
    async fn create_access_token(&self, token: &AccessToken) -> Result<String, StoreError>;

    /// Check for a row matching the exact id, user and client
    ///
    /// Revoked rows still count as existing.
    async fn access_token_exists(
        &self,
        id: &str,
        user_id: i64,
        client_id: &str,
    ) -> Result<bool, StoreError>;

    /// Mark an access token revoked and bump its `updated_at`
    ///
    /// # Returns
    /// * `Ok(true)` - A non-revoked row was flipped
    /// * `Ok(false)` - No matching row, or it was already revoked
    async fn revoke_access_token(
        &self,
        id: &str,
        user_id: i64,
        client_id: &str,
    ) -> Result<bool, StoreError>;

    /// Insert a new refresh token row
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<String, StoreError>;

    /// Fetch a refresh token matching both id and access token id
    ///
    /// # Returns
    /// * `Err(StoreError::NotFound)` - No such row
    async fn get_refresh_token(
        &self,
        id: &str,
        access_token_id: &str,
    ) -> Result<RefreshToken, StoreError>;

    /// Fetch the newest refresh token in the lineage of the presented one
    ///
    /// # Example
    /// ```no_run
    /// # use sso_core::repositories::TokenStore;
    /// # async fn example(store: &impl TokenStore) -> Result<(), Box<dyn std::error::Error>> {
    /// let presented = store.get_refresh_token("r-id", "a-id").await?;
    /// let latest = store
    ///     .get_latest_refresh_token_for_lineage("r-id", "a-id")
    ///     .await?;
    /// if latest.id != presented.id {
    ///     println!("stale refresh token presented");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn get_latest_refresh_token_for_lineage(
        &self,
        presented_id: &str,
        presented_access_token_id: &str,
    ) -> Result<RefreshToken, StoreError>;

    /// Mark a refresh token revoked
    ///
    /// # Returns
    /// * `Ok(true)` - A non-revoked row was flipped
    /// * `Ok(false)` - No matching row, or it was already revoked
    async fn revoke_refresh_token(
        &self,
        id: &str,
        access_token_id: &str,
    ) -> Result<bool, StoreError>;

    /// Persist a brand-new pair.
    ///
    /// The default inserts the two rows one after the other; stores with
    /// transactions should override it so a failed refresh insert leaves no
    /// orphaned access row.
    async fn create_token_pair(
        &self,
        access: &AccessToken,
        refresh: &RefreshToken,
    ) -> Result<(), StoreError> {
        self.create_access_token(access).await?;
        self.create_refresh_token(refresh).await?;
        Ok(())
    }

    /// Revoke the presented pair and insert its replacement atomically.
    ///
    /// The presented refresh token must still be non-revoked and the newest
    /// in its lineage, and the presented access token must exist for the
    /// given user and client. If any check fails nothing is written. Of two
    /// concurrent calls for the same pair at most one returns
    /// [`RotationOutcome::Rotated`].
    async fn rotate_token_pair(&self, commit: &RotationCommit) -> Result<RotationOutcome, StoreError>;
}

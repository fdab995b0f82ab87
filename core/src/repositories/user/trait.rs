//! User store trait for the lookups token issuance needs.

use async_trait::async_trait;

use crate::domain::entities::user::User;
use crate::errors::StoreError;

/// Read access to registered users
///
/// # Example Implementation
/// ```no_run
/// use async_trait::async_trait;
/// use sso_core::domain::entities::user::User;
/// use sso_core::errors::StoreError;
/// use sso_core::repositories::UserStore;
///
/// struct FixedUserStore(User);
///
/// #[async_trait]
/// impl UserStore for FixedUserStore {
///     async fn login(&self, identifier: &str) -> Result<User, StoreError> {
///         if self.0.matches_identifier(identifier) {
///             Ok(self.0.clone())
///         } else {
///             Err(StoreError::NotFound(identifier.to_string()))
///         }
///     }
///
///     async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
///         if self.0.id == id {
///             Ok(self.0.clone())
///         } else {
///             Err(StoreError::NotFound(id.to_string()))
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email or display name, case-insensitively
    ///
    /// # Returns
    /// * `Ok(User)` - User found
    /// * `Err(StoreError::NotFound)` - No user matches
    async fn login(&self, identifier: &str) -> Result<User, StoreError>;

    /// Find a user by internal id
    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;
}

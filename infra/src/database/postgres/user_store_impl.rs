//! PostgreSQL implementation of the UserStore trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use sso_core::domain::entities::user::User;
use sso_core::errors::StoreError;
use sso_core::repositories::UserStore;
use sso_shared::config::TableNames;

use super::Queries;
use crate::database::store_error;

/// PostgreSQL implementation of UserStore
pub struct PgUserStore {
    pool: PgPool,
    queries: Queries,
}

impl PgUserStore {
    pub fn new(pool: PgPool, tables: &TableNames) -> Self {
        Self {
            pool,
            queries: Queries::new(tables),
        }
    }

    fn row_to_user(row: &PgRow) -> Result<User, StoreError> {
        let get_err = |column: &str, e: sqlx::Error| {
            StoreError::Database(format!("Failed to get {}: {}", column, e))
        };

        Ok(User {
            id: row.try_get("id").map_err(|e| get_err("id", e))?,
            uuid: row.try_get("uuid").map_err(|e| get_err("uuid", e))?,
            email: row.try_get("email").map_err(|e| get_err("email", e))?,
            name: row.try_get("name").map_err(|e| get_err("name", e))?,
            password_hash: row
                .try_get("password_hash")
                .map_err(|e| get_err("password_hash", e))?,
        })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn login(&self, identifier: &str) -> Result<User, StoreError> {
        let row = sqlx::query(&self.queries.select_user_by_identifier)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, "user lookup"))?;

        match row {
            Some(row) => Self::row_to_user(&row),
            None => Err(StoreError::NotFound(format!("user {}", identifier))),
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        let row = sqlx::query(&self.queries.select_user_by_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, &format!("user {}", id)))?;

        match row {
            Some(row) => Self::row_to_user(&row),
            None => Err(StoreError::NotFound(format!("user {}", id))),
        }
    }
}

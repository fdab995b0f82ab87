//! PostgreSQL implementation of the TokenStore trait.
//!
//! Pair creation and rotation run inside a single transaction. Rotations of
//! the same user are serialized with a transaction-scoped advisory lock keyed
//! on the user id, so the lineage check and the writes that follow it see a
//! stable view.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use sso_core::domain::entities::token::{AccessToken, RefreshToken};
use sso_core::errors::StoreError;
use sso_core::repositories::{RotationCommit, RotationOutcome, TokenStore};
use sso_shared::config::TableNames;

use super::Queries;
use crate::database::store_error;

/// PostgreSQL implementation of TokenStore
pub struct PgTokenStore {
    /// Database connection pool
    pool: PgPool,
    queries: Queries,
}

impl PgTokenStore {
    pub fn new(pool: PgPool, tables: &TableNames) -> Self {
        Self {
            pool,
            queries: Queries::new(tables),
        }
    }

    /// Convert database row to RefreshToken entity
    fn row_to_refresh(row: &PgRow) -> Result<RefreshToken, StoreError> {
        let get_err = |column: &str, e: sqlx::Error| {
            StoreError::Database(format!("Failed to get {}: {}", column, e))
        };

        Ok(RefreshToken {
            id: row.try_get("id").map_err(|e| get_err("id", e))?,
            access_token_id: row
                .try_get("access_token_id")
                .map_err(|e| get_err("access_token_id", e))?,
            revoked: row.try_get("revoked").map_err(|e| get_err("revoked", e))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(|e| get_err("expires_at", e))?,
        })
    }

    async fn insert_access<'e, E>(&self, executor: E, token: &AccessToken) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(&self.queries.insert_access)
            .bind(&token.id)
            .bind(token.user_id)
            .bind(&token.client_id)
            .bind(&token.name)
            .bind(&token.scopes)
            .bind(token.revoked)
            .bind(token.created_at)
            .bind(token.updated_at)
            .bind(token.expires_at)
            .execute(executor)
            .await
            .map_err(|e| store_error(e, &format!("access token {}", token.id)))?;
        Ok(())
    }

    async fn insert_refresh<'e, E>(&self, executor: E, token: &RefreshToken) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(&self.queries.insert_refresh)
            .bind(&token.id)
            .bind(&token.access_token_id)
            .bind(token.revoked)
            .bind(token.expires_at)
            .execute(executor)
            .await
            .map_err(|e| store_error(e, &format!("refresh token {}", token.id)))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| store_error(e, "begin transaction"))
    }

    /// Run every rotation check inside `tx`, returning early with the
    /// outcome when one fails. Writes happen only after all checks pass.
    async fn rotate_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        commit: &RotationCommit,
    ) -> Result<RotationOutcome, StoreError> {
        let presented = &commit.presented;

        sqlx::query(&self.queries.lock_lineage)
            .bind(presented.user_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error(e, "lineage lock"))?;

        let current = sqlx::query(&self.queries.select_refresh_for_update)
            .bind(&presented.refresh_token_id)
            .bind(&presented.access_token_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| store_error(e, "presented refresh token"))?;
        let current = match current {
            Some(row) => Self::row_to_refresh(&row)?,
            None => return Ok(RotationOutcome::Missing),
        };
        if current.revoked {
            return Ok(RotationOutcome::AlreadyRevoked);
        }

        let latest = sqlx::query(&self.queries.latest_in_lineage)
            .bind(&presented.refresh_token_id)
            .bind(&presented.access_token_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| store_error(e, "refresh token lineage"))?;
        match latest {
            Some(row) if Self::row_to_refresh(&row)?.id == current.id => {}
            Some(_) => return Ok(RotationOutcome::Superseded),
            None => return Ok(RotationOutcome::Missing),
        }

        let access_revoked: Option<bool> = sqlx::query_scalar(&self.queries.access_revoked_flag)
            .bind(&presented.access_token_id)
            .bind(presented.user_id)
            .bind(&presented.client_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| store_error(e, "presented access token"))?;
        match access_revoked {
            Some(false) => {}
            Some(true) => return Ok(RotationOutcome::AlreadyRevoked),
            None => return Ok(RotationOutcome::Missing),
        }

        let revoked = sqlx::query(&self.queries.revoke_refresh)
            .bind(&presented.refresh_token_id)
            .bind(&presented.access_token_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error(e, "revoke refresh token"))?;
        if revoked.rows_affected() == 0 {
            return Ok(RotationOutcome::AlreadyRevoked);
        }

        sqlx::query(&self.queries.revoke_access)
            .bind(&presented.access_token_id)
            .bind(presented.user_id)
            .bind(&presented.client_id)
            .bind(Utc::now().timestamp())
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error(e, "revoke access token"))?;

        self.insert_access(&mut **tx, &commit.access).await?;
        self.insert_refresh(&mut **tx, &commit.refresh).await?;

        Ok(RotationOutcome::Rotated)
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn create_access_token(&self, token: &AccessToken) -> Result<String, StoreError> {
        self.insert_access(&self.pool, token).await?;
        Ok(token.id.clone())
    }

    async fn access_token_exists(
        &self,
        id: &str,
        user_id: i64,
        client_id: &str,
    ) -> Result<bool, StoreError> {
        sqlx::query_scalar(&self.queries.access_exists)
            .bind(id)
            .bind(user_id)
            .bind(client_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error(e, &format!("access token {}", id)))
    }

    async fn revoke_access_token(
        &self,
        id: &str,
        user_id: i64,
        client_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&self.queries.revoke_access)
            .bind(id)
            .bind(user_id)
            .bind(client_id)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, &format!("access token {}", id)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<String, StoreError> {
        self.insert_refresh(&self.pool, token).await?;
        Ok(token.id.clone())
    }

    async fn get_refresh_token(
        &self,
        id: &str,
        access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        let row = sqlx::query(&self.queries.select_refresh)
            .bind(id)
            .bind(access_token_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, &format!("refresh token {}", id)))?;

        match row {
            Some(row) => Self::row_to_refresh(&row),
            None => Err(StoreError::NotFound(format!("refresh token {}", id))),
        }
    }

    async fn get_latest_refresh_token_for_lineage(
        &self,
        presented_id: &str,
        presented_access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        let context = format!("lineage of refresh token {}", presented_id);
        let row = sqlx::query(&self.queries.latest_in_lineage)
            .bind(presented_id)
            .bind(presented_access_token_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, &context))?;

        match row {
            Some(row) => Self::row_to_refresh(&row),
            None => Err(StoreError::NotFound(context)),
        }
    }

    async fn revoke_refresh_token(
        &self,
        id: &str,
        access_token_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&self.queries.revoke_refresh)
            .bind(id)
            .bind(access_token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, &format!("refresh token {}", id)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_token_pair(
        &self,
        access: &AccessToken,
        refresh: &RefreshToken,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        self.insert_access(&mut *tx, access).await?;
        self.insert_refresh(&mut *tx, refresh).await?;
        tx.commit()
            .await
            .map_err(|e| store_error(e, "commit token pair"))
    }

    async fn rotate_token_pair(&self, commit: &RotationCommit) -> Result<RotationOutcome, StoreError> {
        let mut tx = self.begin().await?;

        // Dropping the transaction on an early return rolls it back.
        let outcome = self.rotate_in(&mut tx, commit).await?;
        if outcome != RotationOutcome::Rotated {
            tx.rollback()
                .await
                .map_err(|e| store_error(e, "rollback rotation"))?;
            return Ok(outcome);
        }

        tx.commit()
            .await
            .map_err(|e| store_error(e, "commit rotation"))?;

        tracing::debug!(
            user_id = commit.presented.user_id,
            new_access_token_id = %commit.access.id,
            "rotation committed"
        );
        Ok(RotationOutcome::Rotated)
    }
}

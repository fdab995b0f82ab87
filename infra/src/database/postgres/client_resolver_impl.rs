//! PostgreSQL implementation of the ClientResolver trait.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use sso_core::domain::entities::client::Client;
use sso_core::errors::StoreError;
use sso_core::repositories::ClientResolver;
use sso_shared::config::TableNames;

use super::Queries;
use crate::database::store_error;

/// Resolves OAuth clients from the clients table.
///
/// Revoked clients resolve as not found.
pub struct PgClientResolver {
    pool: PgPool,
    queries: Queries,
}

impl PgClientResolver {
    pub fn new(pool: PgPool, tables: &TableNames) -> Self {
        Self {
            pool,
            queries: Queries::new(tables),
        }
    }
}

#[async_trait]
impl ClientResolver for PgClientResolver {
    async fn get_client(&self, client_id: &str) -> Result<Client, StoreError> {
        let context = format!("client {}", client_id);
        let row = sqlx::query(&self.queries.select_client)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, &context))?
            .ok_or_else(|| StoreError::NotFound(context.clone()))?;

        let read = |column: &str| -> Result<String, StoreError> {
            row.try_get(column)
                .map_err(|e| StoreError::Database(format!("Failed to get {}: {}", column, e)))
        };

        Ok(Client::new(read("id")?, read("name")?, read("secret")?))
    }
}

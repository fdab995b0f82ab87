//! Database module - PostgreSQL implementations using SQLx
//!
//! This module provides database access layer implementations including:
//! - Connection pool management and embedded migrations
//! - Token, client and user stores
//! - Mapping of SQLx failures onto [`StoreError`]

pub mod connection;
pub mod postgres;


use sso_core::errors::StoreError;

pub use connection::DatabasePool;
pub use postgres::{PgClientResolver, PgTokenStore, PgUserStore};

/// Translate a SQLx error into the store error the core layer understands.
///
/// `context` names the record being touched and ends up in the message.
pub fn store_error(err: sqlx::Error, context: &str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(context.to_string()),
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::AlreadyExists(context.to_string())
        }
        other => {
            tracing::error!(error = %other, context, "database operation failed");
            StoreError::Database(format!("{}: {}", context, other))
        }
    }
}

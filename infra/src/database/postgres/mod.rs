//! PostgreSQL store implementations
//!
//! Table names come from configuration, so every statement is rendered once
//! per store from [`TableNames`] instead of being a string literal.

mod client_resolver_impl;
mod token_store_impl;
mod user_store_impl;

pub use client_resolver_impl::PgClientResolver;
pub use token_store_impl::PgTokenStore;
pub use user_store_impl::PgUserStore;

use sso_shared::config::TableNames;

/// SQL statements rendered against a set of table names
#[derive(Debug, Clone)]
pub(crate) struct Queries {
    pub insert_access: String,
    pub access_exists: String,
    pub access_revoked_flag: String,
    pub revoke_access: String,
    pub insert_refresh: String,
    pub select_refresh: String,
    pub select_refresh_for_update: String,
    pub latest_in_lineage: String,
    pub revoke_refresh: String,
    pub lock_lineage: String,
    pub select_client: String,
    pub select_user_by_identifier: String,
    pub select_user_by_id: String,
}

impl Queries {
    pub fn new(tables: &TableNames) -> Self {
        let access = &tables.access_tokens;
        let refresh = &tables.refresh_tokens;

        Self {
            insert_access: format!(
                "INSERT INTO {access} \
                 (id, user_id, client_id, name, scopes, revoked, created_at, updated_at, expires_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ),
            access_exists: format!(
                "SELECT EXISTS(SELECT 1 FROM {access} WHERE id = $1 AND user_id = $2 AND client_id = $3)"
            ),
            access_revoked_flag: format!(
                "SELECT revoked FROM {access} WHERE id = $1 AND user_id = $2 AND client_id = $3"
            ),
            revoke_access: format!(
                "UPDATE {access} SET revoked = TRUE, updated_at = $4 \
                 WHERE id = $1 AND user_id = $2 AND client_id = $3 AND revoked = FALSE"
            ),
            insert_refresh: format!(
                "INSERT INTO {refresh} (id, access_token_id, revoked, expires_at) \
                 VALUES ($1, $2, $3, $4)"
            ),
            select_refresh: format!(
                "SELECT id, access_token_id, revoked, expires_at FROM {refresh} \
                 WHERE id = $1 AND access_token_id = $2"
            ),
            select_refresh_for_update: format!(
                "SELECT id, access_token_id, revoked, expires_at FROM {refresh} \
                 WHERE id = $1 AND access_token_id = $2 FOR UPDATE"
            ),
            latest_in_lineage: format!(
                "SELECT r.id, r.access_token_id, r.revoked, r.expires_at \
                 FROM {refresh} r \
                 JOIN {access} a ON a.id = r.access_token_id \
                 WHERE a.user_id = ( \
                     SELECT pa.user_id FROM {refresh} pr \
                     JOIN {access} pa ON pa.id = pr.access_token_id \
                     WHERE pr.id = $1 AND pr.access_token_id = $2 \
                 ) \
                 ORDER BY r.expires_at DESC, r.issued_seq DESC \
                 LIMIT 1"
            ),
            revoke_refresh: format!(
                "UPDATE {refresh} SET revoked = TRUE \
                 WHERE id = $1 AND access_token_id = $2 AND revoked = FALSE"
            ),
            lock_lineage: "SELECT pg_advisory_xact_lock($1)".to_string(),
            select_client: format!(
                "SELECT id, name, secret FROM {} WHERE id = $1 AND revoked = FALSE",
                tables.clients
            ),
            select_user_by_identifier: format!(
                "SELECT id, uuid, email, name, password_hash FROM {} \
                 WHERE LOWER(email) = LOWER($1) OR LOWER(name) = LOWER($1) \
                 ORDER BY id LIMIT 1",
                tables.users
            ),
            select_user_by_id: format!(
                "SELECT id, uuid, email, name, password_hash FROM {} WHERE id = $1",
                tables.users
            ),
        }
    }
}


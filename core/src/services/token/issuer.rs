//! Token pair issuance

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::entities::client::Client;
use crate::domain::entities::token::{AccessToken, RefreshPayload, RefreshToken};
use crate::domain::entities::user::User;
use crate::domain::value_objects::IssuedTokens;
use crate::errors::TokenError;
use crate::repositories::TokenStore;

use super::codec::{expiry_after, new_token_id, AccessPayload, CryptoCodec};
use super::config::TokenServiceConfig;

/// Who a token pair is being issued to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: i64,
    pub uuid: String,
    pub email: String,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            uuid: user.uuid.clone(),
            email: user.email.clone(),
        }
    }
}

impl From<&RefreshPayload> for TokenSubject {
    fn from(payload: &RefreshPayload) -> Self {
        Self {
            user_id: payload.user_id,
            uuid: payload.uuid.clone(),
            email: payload.email.clone(),
        }
    }
}

/// A fully signed and sealed pair that has not been persisted yet
#[derive(Debug, Clone)]
pub struct MintedPair {
    pub access: AccessToken,
    pub refresh: RefreshToken,
    pub tokens: IssuedTokens,
}

/// Creates new access/refresh pairs
pub struct TokenIssuer<S: TokenStore> {
    store: Arc<S>,
    codec: Arc<CryptoCodec>,
    config: TokenServiceConfig,
}

impl<S: TokenStore> TokenIssuer<S> {
    pub fn new(store: Arc<S>, codec: Arc<CryptoCodec>, config: TokenServiceConfig) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    /// Build, sign and encrypt a new pair without touching the store.
    ///
    /// The refresh token expires strictly after the access token and
    /// references it by id.
    pub fn mint(
        &self,
        subject: &TokenSubject,
        client: &Client,
        scopes: &str,
    ) -> Result<MintedPair, TokenError> {
        let now = Utc::now().timestamp();
        let access_expires_at = expiry_after(now, self.config.access_token_ttl)?;
        let refresh_expires_at = expiry_after(now, self.config.refresh_token_ttl)?;
        let expires_in = access_expires_at - now;

        let access = AccessToken::new(
            new_token_id(),
            subject.user_id,
            client.id.clone(),
            scopes,
            now,
            expires_in,
        );
        let refresh = RefreshToken::new(new_token_id(), access.id.clone(), refresh_expires_at);

        let access_jwt = self.codec.sign_access_token_until(
            &AccessPayload {
                uuid: subject.uuid.clone(),
                email: subject.email.clone(),
                client_id: client.id.clone(),
                scopes: scopes.to_string(),
            },
            access.expires_at,
            &client.secret,
        )?;

        let sealed_refresh = self.codec.encrypt_refresh_payload(&RefreshPayload {
            client_id: client.id.clone(),
            token_refresh_id: refresh.id.clone(),
            token_access_id: access.id.clone(),
            scopes: scopes.to_string(),
            user_id: subject.user_id,
            uuid: subject.uuid.clone(),
            email: subject.email.clone(),
            expires_at: refresh.expires_at,
        })?;

        debug!(
            user_id = subject.user_id,
            client_id = %client.id,
            access_token_id = %access.id,
            "minted token pair"
        );

        Ok(MintedPair {
            tokens: IssuedTokens::new(
                access_jwt,
                sealed_refresh,
                expires_in,
                access.expires_at,
                scopes,
            ),
            access,
            refresh,
        })
    }

    /// Mint a pair and persist it.
    ///
    /// All crypto runs before the first write, so a signing or encryption
    /// failure never leaves rows behind. Earlier pairs of the same user are
    /// left untouched.
    pub async fn issue(
        &self,
        subject: &TokenSubject,
        client: &Client,
        scopes: &str,
    ) -> Result<IssuedTokens, TokenError> {
        let minted = self.mint(subject, client, scopes)?;
        self.store
            .create_token_pair(&minted.access, &minted.refresh)
            .await?;

        info!(
            user_id = subject.user_id,
            client_id = %client.id,
            access_token_id = %minted.access.id,
            "issued token pair"
        );

        Ok(minted.tokens)
    }
}

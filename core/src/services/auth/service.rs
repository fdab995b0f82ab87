//! Main authentication service implementation

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::value_objects::IssuedTokens;
use crate::errors::{DomainError, DomainResult, PublicError, StoreError, TokenError};
use crate::repositories::{ClientResolver, SecurityEventSink, TokenStore, UserStore};
use crate::services::token::{
    CryptoCodec, RefreshRotator, TokenIssuer, TokenServiceConfig, TokenSubject,
};

/// Entry point for the sign-in, refresh and sign-out flows
///
/// Credential checks happen upstream; by the time [`AuthService::sign_in`]
/// runs the caller has already authenticated the user.
pub struct AuthService<S, C, U>
where
    S: TokenStore,
    C: ClientResolver,
    U: UserStore,
{
    /// Token persistence
    store: Arc<S>,
    /// OAuth client lookup
    clients: Arc<C>,
    /// User lookup
    users: Arc<U>,
    issuer: Arc<TokenIssuer<S>>,
    rotator: RefreshRotator<S, C>,
    codec: Arc<CryptoCodec>,
    config: TokenServiceConfig,
}

impl<S, C, U> AuthService<S, C, U>
where
    S: TokenStore,
    C: ClientResolver,
    U: UserStore,
{
    /// Create a new authentication service
    ///
    /// # Arguments
    ///
    /// * `store` - Token persistence
    /// * `clients` - OAuth client lookup
    /// * `users` - User lookup
    /// * `codec` - Signing and refresh token encryption
    /// * `config` - Token lifetimes and rotation deadline
    pub fn new(
        store: Arc<S>,
        clients: Arc<C>,
        users: Arc<U>,
        codec: Arc<CryptoCodec>,
        config: TokenServiceConfig,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(store.clone(), codec.clone(), config.clone()));
        let rotator = RefreshRotator::new(
            store.clone(),
            clients.clone(),
            issuer.clone(),
            codec.clone(),
            &config,
        );

        Self {
            store,
            clients,
            users,
            issuer,
            rotator,
            codec,
            config,
        }
    }

    /// Send security events raised during refresh to `sink`
    pub fn with_event_sink(mut self, sink: Arc<dyn SecurityEventSink>) -> Self {
        self.rotator = self.rotator.with_event_sink(sink);
        self
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    /// Issue a new pair for an authenticated user.
    ///
    /// `identifier` is the user's email or display name. When `scopes` is
    /// `None` the configured default scopes are granted.
    pub async fn sign_in(
        &self,
        identifier: &str,
        client_id: &str,
        scopes: Option<&str>,
    ) -> DomainResult<IssuedTokens> {
        let user = self.users.login(identifier).await.map_err(|e| match e {
            StoreError::NotFound(_) => {
                warn!(client_id = %client_id, "sign-in for unknown user");
                DomainError::Unauthorized
            }
            other => DomainError::Store(other),
        })?;

        let client = self.clients.get_client(client_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => DomainError::Validation {
                message: format!("unknown client: {}", client_id),
            },
            other => DomainError::Store(other),
        })?;

        let scopes = scopes.unwrap_or(self.config.default_scopes.as_str());
        let tokens = self
            .issuer
            .issue(&TokenSubject::from(&user), &client, scopes)
            .await?;

        info!(user_id = user.id, client_id = %client.id, "user signed in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Only the collapsed [`PublicError`] leaves this method; the precise
    /// reason is logged by the rotator.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, PublicError> {
        self.rotator.rotate(refresh_token).await.map_err(|err| {
            if matches!(err, TokenError::CryptoFailed(_)) {
                warn!(error = %err, "refresh failed with internal error");
            }
            err.to_public()
        })
    }

    /// Revoke the pair a refresh token belongs to.
    ///
    /// Returns `true` when at least one row changed state, `false` when the
    /// pair was already revoked.
    pub async fn sign_out(&self, refresh_token: &str) -> Result<bool, PublicError> {
        let payload = self
            .codec
            .decrypt_refresh_token(refresh_token)
            .map_err(|_| PublicError::RefreshTokenInvalid)?;

        let (access_revoked, refresh_revoked) = tokio::join!(
            self.store.revoke_access_token(
                &payload.token_access_id,
                payload.user_id,
                &payload.client_id
            ),
            self.store
                .revoke_refresh_token(&payload.token_refresh_id, &payload.token_access_id),
        );
        let access_revoked = access_revoked.map_err(|e| TokenError::from(e).to_public())?;
        let refresh_revoked = refresh_revoked.map_err(|e| TokenError::from(e).to_public())?;

        info!(
            user_id = payload.user_id,
            client_id = %payload.client_id,
            access_revoked,
            refresh_revoked,
            "user signed out"
        );
        Ok(access_revoked || refresh_revoked)
    }
}

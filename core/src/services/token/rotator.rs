//! Refresh token rotation with replay detection
//!
//! A presented refresh token is exchanged for a brand-new pair exactly once.
//! The flow runs as a sequence of checks, any of which ends the request:
//!
//! 1. decrypt the token (malformed or tampered tokens stop here)
//! 2. compare its embedded expiry with the clock, without touching storage
//! 3. load the stored row and the newest row of the user's lineage together
//! 4. reject revoked rows, and flag a replay when the token is not the newest
//! 5. confirm the paired access token still exists for that user and client
//! 6. resolve the client and mint the replacement pair
//! 7. revoke the old pair and insert the new one in a single store call
//!
//! The whole sequence is bounded by the configured rotation deadline.
//! Decryption runs on the blocking pool so the deadline can fire while the
//! private-key operations are still in progress.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::entities::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::entities::token::{RefreshPayload, RefreshToken};
use crate::domain::value_objects::IssuedTokens;
use crate::errors::{StoreError, TokenError};
use crate::repositories::{
    ClientResolver, NoOpSecurityEventSink, PresentedPair, RotationCommit, RotationOutcome,
    SecurityEventSink, TokenStore,
};

use super::codec::CryptoCodec;
use super::config::TokenServiceConfig;
use super::issuer::{TokenIssuer, TokenSubject};

/// Exchanges refresh tokens for new pairs
pub struct RefreshRotator<S: TokenStore, C: ClientResolver> {
    store: Arc<S>,
    clients: Arc<C>,
    issuer: Arc<TokenIssuer<S>>,
    codec: Arc<CryptoCodec>,
    events: Arc<dyn SecurityEventSink>,
    rotation_timeout: Duration,
}

impl<S: TokenStore, C: ClientResolver> RefreshRotator<S, C> {
    pub fn new(
        store: Arc<S>,
        clients: Arc<C>,
        issuer: Arc<TokenIssuer<S>>,
        codec: Arc<CryptoCodec>,
        config: &TokenServiceConfig,
    ) -> Self {
        Self {
            store,
            clients,
            issuer,
            codec,
            events: Arc::new(NoOpSecurityEventSink),
            rotation_timeout: config.rotation_timeout,
        }
    }

    /// Route replay notifications to `sink`
    pub fn with_event_sink(mut self, sink: Arc<dyn SecurityEventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Rotate under the configured deadline
    pub async fn rotate(&self, presented: &str) -> Result<IssuedTokens, TokenError> {
        self.rotate_with_timeout(presented, self.rotation_timeout).await
    }

    /// Rotate under an explicit deadline.
    ///
    /// When the deadline passes, the in-flight work is dropped. The final
    /// store call is atomic, so a cancelled rotation either committed fully
    /// before the deadline or wrote nothing.
    pub async fn rotate_with_timeout(
        &self,
        presented: &str,
        timeout: Duration,
    ) -> Result<IssuedTokens, TokenError> {
        match tokio::time::timeout(timeout, self.rotate_inner(presented)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "refresh rotation timed out");
                Err(TokenError::Timeout)
            }
        }
    }

    async fn rotate_inner(&self, presented: &str) -> Result<IssuedTokens, TokenError> {
        let payload = self.decrypt(presented).await?;

        if payload.is_expired_at(Utc::now().timestamp()) {
            warn!(
                user_id = payload.user_id,
                client_id = %payload.client_id,
                expired_at = payload.expires_at,
                "refresh token rejected: expired"
            );
            return Err(TokenError::Expired);
        }

        let (current, latest) = tokio::join!(
            self.store
                .get_refresh_token(&payload.token_refresh_id, &payload.token_access_id),
            self.store.get_latest_refresh_token_for_lineage(
                &payload.token_refresh_id,
                &payload.token_access_id
            ),
        );
        let current = current.map_err(|e| self.lookup_failure(&payload, e))?;
        let latest = latest.map_err(|e| self.lookup_failure(&payload, e))?;

        if let Err(err) = check_lineage(&current, &latest) {
            if matches!(err, TokenError::ReplayDetected) {
                self.report(SecurityEventKind::RefreshReplay, &payload).await;
            }
            warn!(
                user_id = payload.user_id,
                client_id = %payload.client_id,
                refresh_token_id = %payload.token_refresh_id,
                reason = err.reason(),
                "refresh token rejected"
            );
            return Err(err);
        }

        let access_exists = self
            .store
            .access_token_exists(&payload.token_access_id, payload.user_id, &payload.client_id)
            .await?;
        if !access_exists {
            warn!(
                user_id = payload.user_id,
                access_token_id = %payload.token_access_id,
                "refresh token rejected: paired access token missing"
            );
            return Err(TokenError::NotFound);
        }

        let client = self
            .clients
            .get_client(&payload.client_id)
            .await
            .map_err(|e| {
                warn!(client_id = %payload.client_id, error = %e, "client resolution failed");
                TokenError::ClientResolutionFailed(e)
            })?;

        let minted = self
            .issuer
            .mint(&TokenSubject::from(&payload), &client, &payload.scopes)?;

        let commit = RotationCommit {
            presented: PresentedPair {
                refresh_token_id: payload.token_refresh_id.clone(),
                access_token_id: payload.token_access_id.clone(),
                user_id: payload.user_id,
                client_id: payload.client_id.clone(),
            },
            access: minted.access,
            refresh: minted.refresh,
        };

        match self.store.rotate_token_pair(&commit).await? {
            RotationOutcome::Rotated => {
                info!(
                    user_id = payload.user_id,
                    client_id = %payload.client_id,
                    old_access_token_id = %payload.token_access_id,
                    new_access_token_id = %commit.access.id,
                    "rotated refresh token"
                );
                Ok(minted.tokens)
            }
            RotationOutcome::AlreadyRevoked => {
                self.report(SecurityEventKind::ConcurrentRotation, &payload).await;
                warn!(
                    user_id = payload.user_id,
                    refresh_token_id = %payload.token_refresh_id,
                    "refresh token consumed by a concurrent rotation"
                );
                Err(TokenError::Revoked)
            }
            RotationOutcome::Superseded => {
                self.report(SecurityEventKind::RefreshReplay, &payload).await;
                warn!(
                    user_id = payload.user_id,
                    refresh_token_id = %payload.token_refresh_id,
                    "refresh token superseded before commit"
                );
                Err(TokenError::ReplayDetected)
            }
            RotationOutcome::Missing => {
                warn!(
                    user_id = payload.user_id,
                    refresh_token_id = %payload.token_refresh_id,
                    "refresh token vanished before commit"
                );
                Err(TokenError::NotFound)
            }
        }
    }

    async fn decrypt(&self, presented: &str) -> Result<RefreshPayload, TokenError> {
        let codec = self.codec.clone();
        let token = presented.to_owned();
        let decrypted = tokio::task::spawn_blocking(move || codec.decrypt_refresh_token(&token))
            .await
            .map_err(|e| {
                warn!(error = %e, "refresh token decryption task failed");
                TokenError::InvalidToken
            })?;

        decrypted.map_err(|e| {
            warn!(error = %e, "refresh token rejected: undecryptable");
            TokenError::InvalidToken
        })
    }

    fn lookup_failure(&self, payload: &RefreshPayload, err: StoreError) -> TokenError {
        match err {
            StoreError::NotFound(_) => {
                warn!(
                    user_id = payload.user_id,
                    refresh_token_id = %payload.token_refresh_id,
                    "refresh token rejected: unknown token"
                );
                TokenError::NotFound
            }
            other => TokenError::PersistenceFailed(other),
        }
    }

    async fn report(&self, kind: SecurityEventKind, payload: &RefreshPayload) {
        let event = SecurityEvent::new(
            kind,
            payload.user_id,
            payload.client_id.clone(),
            payload.token_access_id.clone(),
            payload.token_refresh_id.clone(),
        );
        if let Err(e) = self.events.record(&event).await {
            warn!(error = %e, kind = kind.as_str(), "failed to record security event");
        }
    }
}

/// Decide whether `current` may be rotated given the newest row of its lineage.
///
/// A token that is not the newest is a replay regardless of its own revoked
/// flag; that case is checked first so it is always reported as one.
pub fn check_lineage(current: &RefreshToken, latest: &RefreshToken) -> Result<(), TokenError> {
    if current.id.is_empty() || latest.id.is_empty() {
        return Err(TokenError::NotFound);
    }
    if latest.id != current.id {
        return Err(TokenError::ReplayDetected);
    }
    if current.revoked || latest.revoked {
        return Err(TokenError::Revoked);
    }
    Ok(())
}

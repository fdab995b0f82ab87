//! Shared fixtures for token service tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::domain::entities::client::Client;
use crate::domain::entities::token::{AccessToken, RefreshToken};
use crate::domain::entities::user::User;
use crate::errors::StoreError;
use crate::repositories::{
    InMemoryClientRegistry, InMemorySecurityEventSink, InMemoryTokenStore, RotationCommit,
    RotationOutcome, TokenStore,
};
use crate::services::token::{
    CryptoCodec, RefreshRotator, RsaKeyPair, TokenIssuer, TokenServiceConfig, TokenSubject,
};

pub const TEST_PRIVATE: &str = include_str!("../../../../tests/fixtures/test_private.pem");
pub const TEST_PUBLIC: &str = include_str!("../../../../tests/fixtures/test_public.pem");
pub const OTHER_PRIVATE: &str = include_str!("../../../../tests/fixtures/other_private.pem");
pub const OTHER_PUBLIC: &str = include_str!("../../../../tests/fixtures/other_public.pem");
pub const SMALL_PRIVATE: &str = include_str!("../../../../tests/fixtures/small_private.pem");
pub const SMALL_PUBLIC: &str = include_str!("../../../../tests/fixtures/small_public.pem");

pub const CLIENT_ID: &str = "web";
pub const CLIENT_SECRET: &str = "web-client-secret";

pub fn test_keys() -> Arc<RsaKeyPair> {
    static KEYS: OnceLock<Arc<RsaKeyPair>> = OnceLock::new();
    KEYS.get_or_init(|| Arc::new(RsaKeyPair::from_pem_strings(TEST_PRIVATE, TEST_PUBLIC).unwrap()))
        .clone()
}

pub fn other_keys() -> Arc<RsaKeyPair> {
    Arc::new(RsaKeyPair::from_pem_strings(OTHER_PRIVATE, OTHER_PUBLIC).unwrap())
}

pub fn test_codec() -> Arc<CryptoCodec> {
    Arc::new(CryptoCodec::new(test_keys()))
}

pub fn test_client() -> Client {
    Client::new(CLIENT_ID, "Web App", CLIENT_SECRET)
}

pub fn test_user() -> User {
    User::new(42, "6f1c2a8e-user-42", "ada@example.com").with_name("ada")
}

pub fn test_subject() -> TokenSubject {
    TokenSubject::from(&test_user())
}

/// Everything a rotation test needs, wired over in-memory stores
pub struct Fixture<S: TokenStore = InMemoryTokenStore> {
    pub store: Arc<S>,
    pub clients: Arc<InMemoryClientRegistry>,
    pub codec: Arc<CryptoCodec>,
    pub issuer: Arc<TokenIssuer<S>>,
    pub rotator: Arc<RefreshRotator<S, InMemoryClientRegistry>>,
    pub events: Arc<InMemorySecurityEventSink>,
}

pub fn fixture() -> Fixture {
    fixture_with_store(InMemoryTokenStore::new(), TokenServiceConfig::default())
}

pub fn fixture_with_store<S: TokenStore>(store: S, config: TokenServiceConfig) -> Fixture<S> {
    let store = Arc::new(store);
    let clients = Arc::new(InMemoryClientRegistry::with_clients([test_client()]));
    let codec = test_codec();
    let issuer = Arc::new(TokenIssuer::new(store.clone(), codec.clone(), config.clone()));
    let events = Arc::new(InMemorySecurityEventSink::new());
    let rotator = RefreshRotator::new(
        store.clone(),
        clients.clone(),
        issuer.clone(),
        codec.clone(),
        &config,
    )
    .with_event_sink(events.clone());

    Fixture {
        store,
        clients,
        codec,
        issuer,
        rotator: Arc::new(rotator),
        events,
    }
}

/// Store whose every call fails, counting how often it was reached
#[derive(Default)]
pub struct UnreachableStore {
    pub calls: AtomicUsize,
}

impl UnreachableStore {
    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Database("connection refused".to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for UnreachableStore {
    async fn create_access_token(&self, _token: &AccessToken) -> Result<String, StoreError> {
        self.fail()
    }

    async fn access_token_exists(&self, _id: &str, _user_id: i64, _client_id: &str) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn revoke_access_token(&self, _id: &str, _user_id: i64, _client_id: &str) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn create_refresh_token(&self, _token: &RefreshToken) -> Result<String, StoreError> {
        self.fail()
    }

    async fn get_refresh_token(&self, _id: &str, _access_token_id: &str) -> Result<RefreshToken, StoreError> {
        self.fail()
    }

    async fn get_latest_refresh_token_for_lineage(
        &self,
        _presented_id: &str,
        _presented_access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        self.fail()
    }

    async fn revoke_refresh_token(&self, _id: &str, _access_token_id: &str) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn rotate_token_pair(&self, _commit: &RotationCommit) -> Result<RotationOutcome, StoreError> {
        self.fail()
    }
}

/// In-memory store whose reads stall for a fixed delay
pub struct StallingStore {
    pub inner: InMemoryTokenStore,
    pub delay: Duration,
}

#[async_trait]
impl TokenStore for StallingStore {
    async fn create_access_token(&self, token: &AccessToken) -> Result<String, StoreError> {
        self.inner.create_access_token(token).await
    }

    async fn access_token_exists(&self, id: &str, user_id: i64, client_id: &str) -> Result<bool, StoreError> {
        self.inner.access_token_exists(id, user_id, client_id).await
    }

    async fn revoke_access_token(&self, id: &str, user_id: i64, client_id: &str) -> Result<bool, StoreError> {
        self.inner.revoke_access_token(id, user_id, client_id).await
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<String, StoreError> {
        self.inner.create_refresh_token(token).await
    }

    async fn get_refresh_token(&self, id: &str, access_token_id: &str) -> Result<RefreshToken, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_refresh_token(id, access_token_id).await
    }

    async fn get_latest_refresh_token_for_lineage(
        &self,
        presented_id: &str,
        presented_access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner
            .get_latest_refresh_token_for_lineage(presented_id, presented_access_token_id)
            .await
    }

    async fn revoke_refresh_token(&self, id: &str, access_token_id: &str) -> Result<bool, StoreError> {
        self.inner.revoke_refresh_token(id, access_token_id).await
    }

    async fn rotate_token_pair(&self, commit: &RotationCommit) -> Result<RotationOutcome, StoreError> {
        self.inner.rotate_token_pair(commit).await
    }
}

/// In-memory store whose final rotation commit always reports `outcome`
pub struct FixedOutcomeStore {
    pub inner: InMemoryTokenStore,
    pub outcome: RotationOutcome,
}

#[async_trait]
impl TokenStore for FixedOutcomeStore {
    async fn create_access_token(&self, token: &AccessToken) -> Result<String, StoreError> {
        self.inner.create_access_token(token).await
    }

    async fn access_token_exists(&self, id: &str, user_id: i64, client_id: &str) -> Result<bool, StoreError> {
        self.inner.access_token_exists(id, user_id, client_id).await
    }

    async fn revoke_access_token(&self, id: &str, user_id: i64, client_id: &str) -> Result<bool, StoreError> {
        self.inner.revoke_access_token(id, user_id, client_id).await
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<String, StoreError> {
        self.inner.create_refresh_token(token).await
    }

    async fn get_refresh_token(&self, id: &str, access_token_id: &str) -> Result<RefreshToken, StoreError> {
        self.inner.get_refresh_token(id, access_token_id).await
    }

    async fn get_latest_refresh_token_for_lineage(
        &self,
        presented_id: &str,
        presented_access_token_id: &str,
    ) -> Result<RefreshToken, StoreError> {
        self.inner
            .get_latest_refresh_token_for_lineage(presented_id, presented_access_token_id)
            .await
    }

    async fn revoke_refresh_token(&self, id: &str, access_token_id: &str) -> Result<bool, StoreError> {
        self.inner.revoke_refresh_token(id, access_token_id).await
    }

    async fn rotate_token_pair(&self, _commit: &RotationCommit) -> Result<RotationOutcome, StoreError> {
        Ok(self.outcome)
    }
}

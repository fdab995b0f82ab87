//! Unit tests for token pair issuance

use std::time::Duration;

use crate::domain::entities::client::Client;
use crate::errors::{StoreError, TokenError};
use crate::repositories::TokenStore;
use crate::services::token::TokenServiceConfig;

use super::support::{
    fixture, fixture_with_store, test_client, test_subject, UnreachableStore, CLIENT_SECRET,
};

#[tokio::test]
async fn test_issue_persists_linked_pair() {
    let fx = fixture();
    let subject = test_subject();

    let issued = fx.issuer.issue(&subject, &test_client(), "[*]").await.unwrap();
    assert_eq!(issued.expires_in, 3600);
    assert_eq!(issued.token_type(), "Bearer");

    let (access_rows, refresh_rows) = fx.store.snapshot().await;
    assert_eq!(access_rows.len(), 1);
    assert_eq!(refresh_rows.len(), 1);

    let access = &access_rows[0];
    let refresh = &refresh_rows[0];
    assert_eq!(refresh.access_token_id, access.id);
    assert_eq!(access.user_id, subject.user_id);
    assert_eq!(access.client_id, "web");
    assert!(refresh.expires_at > access.expires_at);
    assert_eq!(issued.expires_at, access.expires_at);
    assert!(!access.revoked && !refresh.revoked);
}

#[tokio::test]
async fn test_refresh_token_references_stored_rows() {
    let fx = fixture();
    let issued = fx
        .issuer
        .issue(&test_subject(), &test_client(), "read write")
        .await
        .unwrap();

    let payload = fx.codec.decrypt_refresh_token(&issued.refresh_token).unwrap();
    assert_eq!(payload.scopes, "read write");
    assert_eq!(payload.user_id, 42);
    assert_eq!(payload.email, "ada@example.com");

    let stored = fx
        .store
        .get_refresh_token(&payload.token_refresh_id, &payload.token_access_id)
        .await
        .unwrap();
    assert_eq!(stored.expires_at, payload.expires_at);
    assert!(fx
        .store
        .access_token_exists(&payload.token_access_id, 42, "web")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_access_token_signed_with_client_secret() {
    let fx = fixture();
    let issued = fx
        .issuer
        .issue(&test_subject(), &test_client(), "[*]")
        .await
        .unwrap();

    let claims = fx
        .codec
        .verify_access_token(&issued.access_token, CLIENT_SECRET)
        .unwrap();
    let (access_rows, _) = fx.store.snapshot().await;
    assert_eq!(claims.exp, access_rows[0].expires_at);
    assert_eq!(claims.uuid, "6f1c2a8e-user-42");

    assert!(fx
        .codec
        .verify_access_token(&issued.access_token, "someone-elses-secret")
        .is_err());
}

#[tokio::test]
async fn test_second_issue_leaves_first_pair_untouched() {
    let fx = fixture();
    fx.issuer.issue(&test_subject(), &test_client(), "[*]").await.unwrap();
    let (first_access, first_refresh) = fx.store.snapshot().await;

    fx.issuer.issue(&test_subject(), &test_client(), "[*]").await.unwrap();
    let (access_rows, refresh_rows) = fx.store.snapshot().await;

    assert_eq!(access_rows.len(), 2);
    assert_eq!(refresh_rows.len(), 2);
    for row in &first_access {
        assert!(access_rows.contains(row));
    }
    for row in &first_refresh {
        assert!(refresh_rows.contains(row));
    }
    assert_eq!(fx.store.active_pair_count(42).await, 2);
}

#[tokio::test]
async fn test_signing_failure_writes_nothing() {
    let fx = fixture();
    let client = Client::new("broken", "Broken", "");

    let err = fx.issuer.issue(&test_subject(), &client, "[*]").await.unwrap_err();
    assert!(matches!(err, TokenError::CryptoFailed(_)));

    let (access_rows, refresh_rows) = fx.store.snapshot().await;
    assert!(access_rows.is_empty());
    assert!(refresh_rows.is_empty());
}

#[tokio::test]
async fn test_out_of_range_lifetime_is_refused() {
    let huge = Duration::from_secs(u64::MAX);
    let fx = fixture_with_store(
        crate::repositories::InMemoryTokenStore::new(),
        TokenServiceConfig::default().with_ttls(Duration::from_secs(60), huge),
    );

    let err = fx
        .issuer
        .issue(&test_subject(), &test_client(), "[*]")
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::CryptoFailed(_)));

    let (access_rows, refresh_rows) = fx.store.snapshot().await;
    assert!(access_rows.is_empty());
    assert!(refresh_rows.is_empty());
}

#[tokio::test]
async fn test_persistence_failure_is_propagated() {
    let fx = fixture_with_store(UnreachableStore::default(), TokenServiceConfig::default());

    let err = fx
        .issuer
        .issue(&test_subject(), &test_client(), "[*]")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TokenError::PersistenceFailed(StoreError::Database(_))
    ));
    assert!(err.is_retryable());
}

#[test]
fn test_mint_produces_distinct_ids() {
    let fx = fixture();
    let first = fx.issuer.mint(&test_subject(), &test_client(), "[*]").unwrap();
    let second = fx.issuer.mint(&test_subject(), &test_client(), "[*]").unwrap();

    assert_ne!(first.access.id, second.access.id);
    assert_ne!(first.refresh.id, second.refresh.id);
    assert_ne!(first.access.id, first.refresh.id);
    assert_eq!(first.refresh.access_token_id, first.access.id);
}

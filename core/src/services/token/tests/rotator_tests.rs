//! Unit tests for refresh rotation and replay detection

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use std::time::{Duration, Instant};

use crate::domain::entities::security_event::SecurityEventKind;
use crate::domain::entities::token::{RefreshPayload, RefreshToken};
use crate::errors::{PublicError, StoreError, TokenError};
use crate::repositories::{InMemoryTokenStore, RotationOutcome, TokenStore};
use crate::services::token::{
    check_lineage, new_token_id, CryptoCodec, TokenServiceConfig, MAX_CIPHERTEXT_BLOCKS,
};

use super::support::{
    fixture, fixture_with_store, other_keys, FixedOutcomeStore, test_client, test_subject, StallingStore,
    UnreachableStore, CLIENT_SECRET,
};

async fn sign_in(fx: &super::support::Fixture) -> String {
    fx.issuer
        .issue(&test_subject(), &test_client(), "[*]")
        .await
        .unwrap()
        .refresh_token
}

#[tokio::test]
async fn test_rotation_returns_fresh_pair_and_revokes_old() {
    let fx = fixture();
    let old_token = sign_in(&fx).await;
    let old = fx.codec.decrypt_refresh_token(&old_token).unwrap();

    let issued = fx.rotator.rotate(&old_token).await.unwrap();
    assert_ne!(issued.refresh_token, old_token);

    let new = fx.codec.decrypt_refresh_token(&issued.refresh_token).unwrap();
    assert_ne!(new.token_access_id, old.token_access_id);
    assert_ne!(new.token_refresh_id, old.token_refresh_id);
    assert_eq!(new.user_id, old.user_id);
    assert_eq!(new.client_id, old.client_id);

    let old_row = fx
        .store
        .get_refresh_token(&old.token_refresh_id, &old.token_access_id)
        .await
        .unwrap();
    assert!(old_row.revoked);
    let (access_rows, _) = fx.store.snapshot().await;
    let old_access = access_rows
        .iter()
        .find(|a| a.id == old.token_access_id)
        .unwrap();
    assert!(old_access.revoked);
    assert!(old_access.updated_at >= old_access.created_at);

    let latest = fx
        .store
        .get_latest_refresh_token_for_lineage(&old.token_refresh_id, &old.token_access_id)
        .await
        .unwrap();
    assert_eq!(latest.id, new.token_refresh_id);
    assert_eq!(fx.store.active_pair_count(42).await, 1);

    let claims = fx
        .codec
        .verify_access_token(&issued.access_token, CLIENT_SECRET)
        .unwrap();
    assert_eq!(claims.client_id, "web");
}

#[tokio::test]
async fn test_rotation_preserves_scopes() {
    let fx = fixture();
    let token = fx
        .issuer
        .issue(&test_subject(), &test_client(), "profile email")
        .await
        .unwrap()
        .refresh_token;

    let issued = fx.rotator.rotate(&token).await.unwrap();
    assert_eq!(issued.scopes, "profile email");
    let claims = fx
        .codec
        .verify_access_token(&issued.access_token, CLIENT_SECRET)
        .unwrap();
    assert_eq!(claims.scopes, "profile email");
}

#[tokio::test]
async fn test_replayed_token_rejected_without_mutation() {
    let fx = fixture();
    let first = sign_in(&fx).await;
    let second = fx.rotator.rotate(&first).await.unwrap().refresh_token;
    let before = fx.store.snapshot().await;

    let err = fx.rotator.rotate(&first).await.unwrap_err();
    assert!(matches!(err, TokenError::ReplayDetected));
    assert_eq!(err.to_public(), PublicError::RefreshTokenInvalid);
    assert_eq!(fx.store.snapshot().await, before);
    assert_eq!(fx.events.count(SecurityEventKind::RefreshReplay).await, 1);

    // The legitimate holder is unaffected.
    fx.rotator.rotate(&second).await.unwrap();
}

#[tokio::test]
async fn test_token_superseded_by_new_sign_in_is_replay() {
    let fx = fixture();
    let first = sign_in(&fx).await;
    let _second = sign_in(&fx).await;

    let err = fx.rotator.rotate(&first).await.unwrap_err();
    assert!(matches!(err, TokenError::ReplayDetected));
    assert_eq!(fx.events.count(SecurityEventKind::RefreshReplay).await, 1);
}

#[tokio::test]
async fn test_expired_token_rejected_before_any_store_access() {
    let fx = fixture_with_store(UnreachableStore::default(), TokenServiceConfig::default());
    let payload = RefreshPayload {
        client_id: "web".to_string(),
        token_refresh_id: new_token_id(),
        token_access_id: new_token_id(),
        scopes: "[*]".to_string(),
        user_id: 42,
        uuid: "6f1c2a8e-user-42".to_string(),
        email: "ada@example.com".to_string(),
        expires_at: Utc::now().timestamp() - 1,
    };
    let token = fx.codec.encrypt_refresh_payload(&payload).unwrap();

    let err = fx.rotator.rotate(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::Expired));
    assert_eq!(fx.store.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_tokens_are_invalid() {
    let fx = fixture();
    let genuine = sign_in(&fx).await;
    let mut tampered: Vec<char> = genuine.chars().collect();
    tampered[10] = if tampered[10] == 'A' { 'B' } else { 'A' };
    let tampered: String = tampered.into_iter().collect();

    for token in ["", "garbage", "!!!!", tampered.as_str()] {
        let err = fx.rotator.rotate(token).await.unwrap_err();
        assert!(matches!(err, TokenError::InvalidToken), "{token:?}: {err:?}");
        assert!(err.is_validation());
    }
    assert_eq!(fx.store.active_pair_count(42).await, 1);
}

#[tokio::test]
async fn test_token_sealed_with_foreign_key_is_invalid() {
    let fx = fixture();
    let genuine = sign_in(&fx).await;
    let payload = fx.codec.decrypt_refresh_token(&genuine).unwrap();

    let foreign = CryptoCodec::new(other_keys())
        .encrypt_refresh_payload(&payload)
        .unwrap();
    let err = fx.rotator.rotate(&foreign).await.unwrap_err();
    assert!(matches!(err, TokenError::InvalidToken));
}

#[tokio::test]
async fn test_unknown_token_not_found() {
    let fx = fixture();
    let genuine = sign_in(&fx).await;
    let mut payload = fx.codec.decrypt_refresh_token(&genuine).unwrap();
    payload.token_refresh_id = new_token_id();

    let forged = fx.codec.encrypt_refresh_payload(&payload).unwrap();
    let err = fx.rotator.rotate(&forged).await.unwrap_err();
    assert!(matches!(err, TokenError::NotFound));
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_client_mismatch_is_rejected() {
    let fx = fixture();
    let genuine = sign_in(&fx).await;
    let mut payload = fx.codec.decrypt_refresh_token(&genuine).unwrap();
    payload.client_id = "mobile".to_string();

    let forged = fx.codec.encrypt_refresh_payload(&payload).unwrap();
    let before = fx.store.snapshot().await;
    let err = fx.rotator.rotate(&forged).await.unwrap_err();
    assert!(matches!(err, TokenError::NotFound));
    assert_eq!(fx.store.snapshot().await, before);
}

#[tokio::test]
async fn test_unresolvable_client_is_retryable_and_writes_nothing() {
    let fx = fixture();
    let token = sign_in(&fx).await;
    fx.clients.remove("web").await;
    let before = fx.store.snapshot().await;

    let err = fx.rotator.rotate(&token).await.unwrap_err();
    assert!(matches!(
        err,
        TokenError::ClientResolutionFailed(StoreError::NotFound(_))
    ));
    assert!(err.is_retryable());
    assert_eq!(err.to_public(), PublicError::TemporarilyUnavailable);
    assert_eq!(fx.store.snapshot().await, before);

    // Once the client is back, the same token still works.
    fx.clients.register(test_client()).await;
    fx.rotator.rotate(&token).await.unwrap();
}

#[tokio::test]
async fn test_store_outage_is_retryable() {
    let fx = fixture();
    let token = sign_in(&fx).await;

    let broken = fixture_with_store(UnreachableStore::default(), TokenServiceConfig::default());
    let err = broken.rotator.rotate(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::PersistenceFailed(StoreError::Database(_))));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_repeated_rotation_keeps_one_active_pair() {
    let fx = fixture();
    let mut token = sign_in(&fx).await;
    let mut spent = Vec::new();

    for _ in 0..5 {
        let next = fx.rotator.rotate(&token).await.unwrap().refresh_token;
        spent.push(std::mem::replace(&mut token, next));
        assert_eq!(fx.store.active_pair_count(42).await, 1);
    }

    for old in &spent {
        let err = fx.rotator.rotate(old).await.unwrap_err();
        assert!(err.is_validation());
    }
    fx.rotator.rotate(&token).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_single_winner() {
    for _ in 0..5 {
        let fx = fixture();
        let token = sign_in(&fx).await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let rotator = fx.rotator.clone();
                let token = token.clone();
                tokio::spawn(async move { rotator.rotate(&token).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(err) => assert!(err.is_validation(), "loser got {err:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(fx.store.active_pair_count(42).await, 1);
        let (access_rows, refresh_rows) = fx.store.snapshot().await;
        assert_eq!(access_rows.len(), 2);
        assert_eq!(refresh_rows.len(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_rotation_deadline_leaves_store_untouched() {
    let inner = InMemoryTokenStore::new();
    let fx = fixture_with_store(
        StallingStore {
            inner: inner.clone(),
            delay: Duration::from_secs(30),
        },
        TokenServiceConfig::default().with_rotation_timeout(Duration::from_millis(100)),
    );
    let token = fx
        .issuer
        .issue(&test_subject(), &test_client(), "[*]")
        .await
        .unwrap()
        .refresh_token;
    let before = inner.snapshot().await;

    let err = fx.rotator.rotate(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::Timeout));
    assert!(err.is_retryable());
    assert_eq!(inner.snapshot().await, before);
}

#[tokio::test]
async fn test_pair_vanishing_before_commit_is_not_found() {
    let inner = InMemoryTokenStore::new();
    let fx = fixture_with_store(
        FixedOutcomeStore {
            inner: inner.clone(),
            outcome: RotationOutcome::Missing,
        },
        TokenServiceConfig::default(),
    );
    let token = fx
        .issuer
        .issue(&test_subject(), &test_client(), "[*]")
        .await
        .unwrap()
        .refresh_token;

    let err = fx.rotator.rotate(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::NotFound));
    assert_eq!(fx.events.events().await.len(), 0);
    assert_eq!(inner.active_pair_count(42).await, 1);
}

/// The first block of a genuine token repeated `count` times. Every block
/// opens under the service key, so each one costs a private-key operation.
fn repeated_first_block(token: &str, count: usize) -> String {
    let ciphertext = URL_SAFE_NO_PAD.decode(token).unwrap();
    URL_SAFE_NO_PAD.encode(ciphertext[..256].repeat(count))
}

#[tokio::test]
async fn test_oversized_token_rejected_without_decrypting() {
    let fx = fixture();
    let genuine = sign_in(&fx).await;
    let oversized = repeated_first_block(&genuine, 3000);

    let started = Instant::now();
    let err = fx
        .rotator
        .rotate_with_timeout(&oversized, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::InvalidToken));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(fx.store.active_pair_count(42).await, 1);
}

#[tokio::test]
async fn test_deadline_fires_during_decryption() {
    let fx = fixture();
    let genuine = sign_in(&fx).await;
    let heaviest = repeated_first_block(&genuine, MAX_CIPHERTEXT_BLOCKS);

    // Same input, opened inline, to learn how long decryption takes here.
    let started = Instant::now();
    assert!(fx.codec.decrypt_refresh_token(&heaviest).is_err());
    let decrypt_time = started.elapsed();

    let err = fx
        .rotator
        .rotate_with_timeout(&heaviest, Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Timeout), "{err:?}, inline decryption took {decrypt_time:?}");
    assert_eq!(fx.store.active_pair_count(42).await, 1);
}

#[test]
fn test_check_lineage() {
    let current = RefreshToken::new("r1".to_string(), "a1", 100);
    let newer = RefreshToken::new("r2".to_string(), "a2", 200);

    assert!(check_lineage(&current, &current).is_ok());
    assert!(matches!(
        check_lineage(&current, &newer),
        Err(TokenError::ReplayDetected)
    ));

    let mut revoked = current.clone();
    revoked.revoked = true;
    assert!(matches!(
        check_lineage(&revoked, &revoked),
        Err(TokenError::Revoked)
    ));
    // A stale token that is also revoked is still reported as a replay.
    assert!(matches!(
        check_lineage(&revoked, &newer),
        Err(TokenError::ReplayDetected)
    ));

    let blank = RefreshToken::new(String::new(), "a1", 100);
    assert!(matches!(check_lineage(&blank, &blank), Err(TokenError::NotFound)));
}

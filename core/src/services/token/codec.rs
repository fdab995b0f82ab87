//! Token codec: access token signing, refresh token encryption and id hashing

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha512};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::entities::token::{AccessClaims, RefreshPayload};
use crate::errors::CryptoError;

use super::key_manager::RsaKeyPair;

/// OAEP overhead with a SHA-512 digest: two hash lengths plus two bytes
const OAEP_SHA512_OVERHEAD: usize = 2 * 64 + 2;

/// Most OAEP blocks a sealed token may carry. Each block costs one
/// private-key operation to open, so longer input is refused unread.
pub const MAX_CIPHERTEXT_BLOCKS: usize = 8;

/// Identity and scope an access token is signed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPayload {
    pub uuid: String,
    pub email: String,
    pub client_id: String,
    pub scopes: String,
}

/// Signs access tokens and seals refresh tokens with the service key pair
#[derive(Debug, Clone)]
pub struct CryptoCodec {
    keys: Arc<RsaKeyPair>,
}

impl CryptoCodec {
    pub fn new(keys: Arc<RsaKeyPair>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &RsaKeyPair {
        &self.keys
    }

    /// Sign an HS512 access token valid for `ttl` from now
    pub fn sign_access_token(
        &self,
        payload: &AccessPayload,
        ttl: Duration,
        client_secret: &str,
    ) -> Result<String, CryptoError> {
        let expires_at = expiry_after(Utc::now().timestamp(), ttl)?;
        self.sign_access_token_until(payload, expires_at, client_secret)
    }

    /// Sign an HS512 access token expiring at `expires_at` (unix seconds)
    pub fn sign_access_token_until(
        &self,
        payload: &AccessPayload,
        expires_at: i64,
        client_secret: &str,
    ) -> Result<String, CryptoError> {
        if client_secret.is_empty() {
            return Err(CryptoError::Signing("client secret is empty".to_string()));
        }

        let claims = AccessClaims {
            uuid: payload.uuid.clone(),
            email: payload.email.clone(),
            client_id: payload.client_id.clone(),
            scopes: payload.scopes.clone(),
            exp: expires_at,
        };

        encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(client_secret.as_bytes()),
        )
        .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// Verify an access token against the issuing client's secret
    pub fn verify_access_token(
        &self,
        token: &str,
        client_secret: &str,
    ) -> Result<AccessClaims, CryptoError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;

        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(client_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| CryptoError::Decode(e.to_string()))
    }

    /// Serialize and encrypt a refresh payload with the service public key
    pub fn encrypt_refresh_payload(&self, payload: &RefreshPayload) -> Result<String, CryptoError> {
        let json = serde_json::to_vec(payload)
            .map_err(|e| CryptoError::Encoding(format!("payload serialization: {}", e)))?;
        encrypt_with_public_key(&json, self.keys.public_key())
    }

    /// Decrypt and parse a refresh token produced by [`Self::encrypt_refresh_payload`]
    pub fn decrypt_refresh_token(&self, token: &str) -> Result<RefreshPayload, CryptoError> {
        let plaintext = decrypt_with_private_key(token, self.keys.private_key())?;
        serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Parse(e.to_string()))
    }
}

/// `now` plus `ttl` in unix seconds. Lifetimes that leave the `i64` range
/// are refused instead of wrapping.
pub(crate) fn expiry_after(now: i64, ttl: Duration) -> Result<i64, CryptoError> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| {
            CryptoError::Signing(format!("token lifetime of {}s is out of range", ttl.as_secs()))
        })
}

/// Largest plaintext chunk a single OAEP-SHA512 block can carry under `key`
pub fn max_chunk_len(key: &RsaPublicKey) -> Result<usize, CryptoError> {
    key.size()
        .checked_sub(OAEP_SHA512_OVERHEAD)
        .filter(|len| *len > 0)
        .ok_or_else(|| {
            CryptoError::Encoding(format!(
                "{}-bit key is too small for OAEP-SHA512",
                key.size() * 8
            ))
        })
}

/// Encrypt arbitrary bytes with RSA-OAEP (SHA-512), chunked to fit the key,
/// and encode the concatenated ciphertext as unpadded base64url.
pub fn encrypt_with_public_key(data: &[u8], key: &RsaPublicKey) -> Result<String, CryptoError> {
    let chunk_len = max_chunk_len(key)?;
    let blocks = data.len().div_ceil(chunk_len).max(1);
    if blocks > MAX_CIPHERTEXT_BLOCKS {
        return Err(CryptoError::Encoding(format!(
            "{} bytes need {} blocks, at most {} allowed",
            data.len(),
            blocks,
            MAX_CIPHERTEXT_BLOCKS
        )));
    }

    let mut rng = rand::thread_rng();
    let mut ciphertext = Vec::with_capacity(blocks * key.size());

    for chunk in data.chunks(chunk_len) {
        let block = key
            .encrypt(&mut rng, Oaep::new::<Sha512>(), chunk)
            .map_err(|e| CryptoError::Encoding(format!("OAEP encryption: {}", e)))?;
        ciphertext.extend_from_slice(&block);
    }

    Ok(URL_SAFE_NO_PAD.encode(ciphertext))
}

/// Reverse of [`encrypt_with_public_key`].
///
/// Trailing `=` padding is tolerated. Input longer than
/// [`MAX_CIPHERTEXT_BLOCKS`] blocks is rejected before base64 decoding, and
/// ciphertext whose length is not a whole number of key-sized blocks is
/// rejected before any decryption.
pub fn decrypt_with_private_key(token: &str, key: &RsaPrivateKey) -> Result<Vec<u8>, CryptoError> {
    let block_len = key.size();
    let encoded = token.trim_end_matches('=');
    let max_encoded_len = (MAX_CIPHERTEXT_BLOCKS * block_len * 4).div_ceil(3);
    if encoded.len() > max_encoded_len {
        return Err(CryptoError::Decode(format!(
            "token of {} characters exceeds {}",
            encoded.len(),
            max_encoded_len
        )));
    }

    let ciphertext = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CryptoError::Decode(e.to_string()))?;

    if ciphertext.is_empty() || ciphertext.len() % block_len != 0 {
        return Err(CryptoError::Decode(format!(
            "ciphertext length {} is not a multiple of {}",
            ciphertext.len(),
            block_len
        )));
    }

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for block in ciphertext.chunks(block_len) {
        let chunk = key
            .decrypt(Oaep::new::<Sha512>(), block)
            .map_err(|_| CryptoError::Crypto)?;
        plaintext.extend_from_slice(&chunk);
    }

    Ok(plaintext)
}

/// Hex SHA-256 digest of `seed`
pub fn hash_token_id(seed: &str) -> String {
    hex::encode(Sha256::digest(seed.as_bytes()))
}

/// New unique token id derived from a random UUID
pub fn new_token_id() -> String {
    hash_token_id(&Uuid::new_v4().to_string())
}

//! Token services for the access/refresh pair lifecycle
//!
//! - HS512 access token signing with per-client secrets
//! - RSA-OAEP sealed refresh tokens
//! - Pair issuance at sign-in
//! - Refresh rotation with replay detection

mod codec;
mod config;
mod issuer;
mod key_manager;
mod rotator;

#[cfg(test)]
mod tests;

pub use codec::{
    decrypt_with_private_key, encrypt_with_public_key, hash_token_id, max_chunk_len,
    new_token_id, AccessPayload, CryptoCodec, MAX_CIPHERTEXT_BLOCKS,
};
pub use config::TokenServiceConfig;
pub use issuer::{MintedPair, TokenIssuer, TokenSubject};
pub use key_manager::{RsaKeyPair, DEFAULT_KEY_BITS};
pub use rotator::{check_lineage, RefreshRotator};

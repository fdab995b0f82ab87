//! RSA key pair management for refresh token encryption

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1::{
    DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding,
};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::{Path, PathBuf};

use sso_shared::config::TokenConfig;

use crate::errors::CryptoError;

/// Default modulus size for generated keys
pub const DEFAULT_KEY_BITS: usize = 4096;

/// RSA key pair used to encrypt and decrypt refresh tokens
#[derive(Clone)]
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    /// Path to private key file
    private_key_path: PathBuf,
    /// Path to public key file
    public_key_path: PathBuf,
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .finish()
    }
}

impl RsaKeyPair {
    /// Loads a key pair from PEM files
    ///
    /// Accepts PKCS#1 (`RSA PRIVATE KEY` / `RSA PUBLIC KEY`) and PKCS#8 /
    /// SPKI (`PRIVATE KEY` / `PUBLIC KEY`) encodings. The PEM label is not
    /// trusted: a PKCS#1 body under a PKCS#8 label still loads.
    ///
    /// # Arguments
    ///
    /// * `private_key_path` - Path to the PEM-encoded private key file
    /// * `public_key_path` - Path to the PEM-encoded public key file
    ///
    /// # Returns
    ///
    /// * `Ok(RsaKeyPair)` - Keys loaded and verified to belong together
    /// * `Err(CryptoError::KeyLoad)` - Unreadable, unparsable or mismatched keys
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sso_core::services::token::RsaKeyPair;
    ///
    /// let keys = RsaKeyPair::from_pem_files(
    ///     "storage/secret/oauth-private.key",
    ///     "storage/secret/oauth-public.key",
    /// )?;
    /// # Ok::<(), sso_core::errors::CryptoError>(())
    /// ```
    pub fn from_pem_files<P: AsRef<Path>>(
        private_key_path: P,
        public_key_path: P,
    ) -> Result<Self, CryptoError> {
        let private_key_path = private_key_path.as_ref().to_path_buf();
        let public_key_path = public_key_path.as_ref().to_path_buf();

        let private_pem = fs::read_to_string(&private_key_path).map_err(|e| {
            CryptoError::KeyLoad(format!(
                "Failed to read private key {}: {}",
                private_key_path.display(),
                e
            ))
        })?;
        let public_pem = fs::read_to_string(&public_key_path).map_err(|e| {
            CryptoError::KeyLoad(format!(
                "Failed to read public key {}: {}",
                public_key_path.display(),
                e
            ))
        })?;

        let mut pair = Self::from_pem_strings(&private_pem, &public_pem)?;
        pair.private_key_path = private_key_path;
        pair.public_key_path = public_key_path;
        Ok(pair)
    }

    /// Loads the key pair named by the token configuration
    pub fn from_config(config: &TokenConfig) -> Result<Self, CryptoError> {
        Self::from_pem_files(&config.private_key_path, &config.public_key_path)
    }

    /// Creates a key pair from PEM strings (useful for testing or embedded keys)
    pub fn from_pem_strings(private_key_pem: &str, public_key_pem: &str) -> Result<Self, CryptoError> {
        let private_key = parse_private_key(private_key_pem)?;
        let public_key = parse_public_key(public_key_pem)?;

        if RsaPublicKey::from(&private_key) != public_key {
            return Err(CryptoError::KeyLoad(
                "Public key does not match private key".to_string(),
            ));
        }

        Ok(Self {
            private_key,
            public_key,
            private_key_path: PathBuf::from("memory"),
            public_key_path: PathBuf::from("memory"),
        })
    }

    /// Generates a fresh key pair
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CryptoError::KeyLoad(format!("Key generation failed: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            private_key,
            public_key,
            private_key_path: PathBuf::from("memory"),
            public_key_path: PathBuf::from("memory"),
        })
    }

    /// PKCS#1 PEM encodings of the private and public halves
    pub fn to_pem_strings(&self) -> Result<(String, String), CryptoError> {
        let private_pem = self
            .private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Encoding(format!("Private key PEM encoding: {}", e)))?;
        let public_pem = self
            .public_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Encoding(format!("Public key PEM encoding: {}", e)))?;
        Ok((private_pem.to_string(), public_pem))
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Modulus length in bits
    pub fn bits(&self) -> usize {
        self.public_key.size() * 8
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }

    // Label and body disagree; fall back to the raw DER.
    let der = pem_body(pem)?;
    RsaPrivateKey::from_pkcs1_der(&der)
        .or_else(|_| RsaPrivateKey::from_pkcs8_der(&der))
        .map_err(|e| CryptoError::KeyLoad(format!("Invalid private key format: {}", e)))
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    if let Ok(key) = RsaPublicKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
        return Ok(key);
    }

    let der = pem_body(pem)?;
    RsaPublicKey::from_pkcs1_der(&der)
        .or_else(|_| RsaPublicKey::from_public_key_der(&der))
        .map_err(|e| CryptoError::KeyLoad(format!("Invalid public key format: {}", e)))
}

/// Base64 body of a PEM document with armour lines stripped
fn pem_body(pem: &str) -> Result<Vec<u8>, CryptoError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(CryptoError::KeyLoad("Empty PEM document".to_string()));
    }
    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| CryptoError::KeyLoad(format!("Invalid PEM body: {}", e)))
}

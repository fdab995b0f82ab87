//! Writing RSA key pairs to disk

use std::fs;
use std::path::{Path, PathBuf};

use sso_core::services::token::RsaKeyPair;
use sso_shared::config::TokenConfig;

use crate::InfrastructureError;

pub const PRIVATE_KEY_FILE: &str = "oauth-private.key";
pub const PUBLIC_KEY_FILE: &str = "oauth-public.key";

/// Destination of a generated key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyFiles {
    /// The standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            private_key: dir.join(PRIVATE_KEY_FILE),
            public_key: dir.join(PUBLIC_KEY_FILE),
        }
    }

    /// The paths the token services load keys from
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            private_key: config.private_key_path.clone(),
            public_key: config.public_key_path.clone(),
        }
    }

    /// Write both halves as PKCS#1 PEM, creating parent directories.
    ///
    /// Existing files are overwritten. On unix both files end up mode 0600.
    pub fn write(&self, keys: &RsaKeyPair) -> Result<(), InfrastructureError> {
        let (private_pem, public_pem) = keys.to_pem_strings().map_err(InfrastructureError::Crypto)?;
        write_key_file(&self.private_key, &private_pem)?;
        write_key_file(&self.public_key, &public_pem)?;
        Ok(())
    }
}

fn write_key_file(path: &Path, pem: &str) -> Result<(), InfrastructureError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, pem)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %path.display(), "Key saved");
    Ok(())
}

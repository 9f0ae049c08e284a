//! Vault configuration.
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid config.

use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::keys::{KdfParams, DEFAULT_ITERATIONS};

/// Characters per PIN stage.
pub const DEFAULT_PIN_STAGE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Store key holding the current encrypted blob.
    pub blob_key: String,
    /// Store key holding the pre-encryption plaintext collection.
    pub legacy_key: String,
    /// PBKDF2 iterations. Not recorded in the blob: changing this for an
    /// existing vault makes it undecryptable.
    pub kdf_iterations: NonZeroU32,
    /// Characters per PIN stage; the passphrase is two stages long.
    pub pin_stage_len: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            blob_key: "vault_passwords_encrypted".to_string(),
            legacy_key: "vault_passwords".to_string(),
            kdf_iterations: KdfParams::default().iterations,
            pin_stage_len: DEFAULT_PIN_STAGE_LEN,
        }
    }
}

impl VaultConfig {
    pub fn from_json_str(text: &str) -> VaultResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> VaultResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.blob_key.is_empty() || self.legacy_key.is_empty() {
            return Err(VaultError::Config("store keys must not be empty".into()));
        }
        if self.blob_key == self.legacy_key {
            return Err(VaultError::Config(
                "blob_key and legacy_key must differ".into(),
            ));
        }
        if self.pin_stage_len == 0 {
            return Err(VaultError::Config("pin_stage_len must be at least 1".into()));
        }
        if self.kdf_iterations.get() < DEFAULT_ITERATIONS {
            tracing::warn!(
                iterations = self.kdf_iterations.get(),
                "kdf iteration count below the default"
            );
        }
        Ok(())
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.kdf_iterations)
    }
}

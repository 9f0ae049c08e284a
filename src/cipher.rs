//! Passphrase-based authenticated encryption into a single text blob.
//!
//! # Blob layout
//! ```text
//! base64( salt (16 bytes) || iv (12 bytes) || ciphertext + GCM tag )
//! ```
//!
//! There is no magic number or version byte. The layout is fixed by
//! `SALT_LEN` and `IV_LEN`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ring::digest;
use subtle::ConstantTimeEq;

use crate::crypto::{self, IV_LEN, TAG_LEN};
use crate::error::VaultError;
use crate::keys::{self, KdfParams, SALT_LEN};

/// Appended to the passphrase by `hash_password` when no salt is given.
pub const DEFAULT_SALT: &str = "pinvault.default-salt.v1";

/// The smallest decoded blob that can possibly authenticate.
const MIN_BLOB_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// The three segments of a decoded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobParts {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

impl BlobParts {
    /// Concatenate the segments and base64-encode them.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(SALT_LEN + IV_LEN + self.ciphertext.len());
        raw.extend_from_slice(&self.salt);
        raw.extend_from_slice(&self.iv);
        raw.extend_from_slice(&self.ciphertext);
        STANDARD.encode(raw)
    }
}

/// Split an encoded blob into salt, iv and ciphertext.
///
/// Malformed base64 and truncated input are reported as `Decryption`, the
/// same as an authentication failure.
pub fn decode_blob(blob: &str) -> Result<BlobParts, VaultError> {
    let raw = STANDARD
        .decode(blob.trim())
        .map_err(|_| VaultError::Decryption)?;
    if raw.len() < MIN_BLOB_LEN {
        return Err(VaultError::Decryption);
    }

    let (salt, rest) = raw.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    Ok(BlobParts {
        salt: salt.try_into().map_err(|_| VaultError::Decryption)?,
        iv: iv.try_into().map_err(|_| VaultError::Decryption)?,
        ciphertext: ciphertext.to_vec(),
    })
}

/// Encrypts and decrypts text under a passphrase.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherService {
    params: KdfParams,
}

impl CipherService {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Encrypt `plaintext` under `passphrase`.
    ///
    /// A fresh salt and IV are drawn for every call, so encrypting the same
    /// input twice never yields the same blob.
    pub fn encrypt(&self, plaintext: &str, passphrase: &str) -> Result<String, VaultError> {
        let salt: [u8; SALT_LEN] = crypto::random_array()?;
        let iv: [u8; IV_LEN] = crypto::random_array()?;

        let key = keys::derive_key(passphrase, &salt, self.params);
        let ciphertext = crypto::seal(key.as_bytes(), iv, plaintext.as_bytes())?;

        Ok(BlobParts {
            salt,
            iv,
            ciphertext,
        }
        .encode())
    }

    /// Decrypt a blob produced by `encrypt`.
    ///
    /// Wrong passphrase, tampering, truncation and non-UTF-8 plaintext all
    /// return the same `Decryption` error.
    pub fn decrypt(&self, blob: &str, passphrase: &str) -> Result<String, VaultError> {
        let parts = decode_blob(blob)?;

        let key = keys::derive_key(passphrase, &parts.salt, self.params);
        let plaintext = crypto::open(key.as_bytes(), parts.iv, &parts.ciphertext)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::Decryption)
    }
}

/// Hex SHA-256 of `passphrase + salt`, falling back to `DEFAULT_SALT`.
///
/// Not used to gate authentication.
pub fn hash_password(passphrase: &str, salt: Option<&str>) -> String {
    let mut input = String::with_capacity(passphrase.len() + DEFAULT_SALT.len());
    input.push_str(passphrase);
    input.push_str(salt.unwrap_or(DEFAULT_SALT));
    hex::encode(digest::digest(&digest::SHA256, input.as_bytes()))
}

/// Check `passphrase` against a hash from `hash_password`.
pub fn verify_password(passphrase: &str, salt: Option<&str>, expected_hex: &str) -> bool {
    let actual = hash_password(passphrase, salt);
    actual.as_bytes().ct_eq(expected_hex.as_bytes()).into()
}

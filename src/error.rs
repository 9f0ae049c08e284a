//! Error types for pinvault.
//!
//! Messages signal *what* failed without revealing *why* in ways that could
//! leak cryptographic state. A wrong PIN and a corrupted blob produce the
//! same `Decryption` error.

use thiserror::Error;

use crate::storage::StoreError;

/// The single error type for all vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Wrong passphrase, corrupted blob, or tampered ciphertext.
    #[error("decryption failed")]
    Decryption,

    /// The backing store rejected a write. The previously stored value is
    /// left in place.
    #[error("storage write rejected: {0}")]
    StorageWrite(#[from] StoreError),

    /// The system RNG or the AEAD primitive could not be used.
    #[error("cryptographic primitives unavailable")]
    CryptoUnavailable,

    /// A vault read or write was attempted without an open session.
    #[error("vault is locked")]
    NotAuthenticated,

    /// A PIN stage was submitted with the wrong number of characters.
    #[error("PIN stage must be {expected} characters, got {found}")]
    InvalidPinChunk { expected: usize, found: usize },

    /// PIN input was delivered while a session is already open.
    #[error("vault is already unlocked")]
    AlreadyUnlocked,

    /// A collection to be saved repeats a record id.
    #[error("duplicate record id: {0}")]
    DuplicateId(String),

    /// The legacy plaintext collection could not be parsed.
    #[error("legacy record collection is unreadable: {0}")]
    LegacyData(#[source] serde_json::Error),

    /// The record collection could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;

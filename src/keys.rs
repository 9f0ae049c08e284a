//! Key derivation and ownership.
//!
//! Turns a passphrase and a stored salt into an AES-256 key using
//! PBKDF2-HMAC-SHA256. The derived key lives in a type that is opaque,
//! non-cloneable, and zeroised on drop.
//!
//! ## Derivation structure
//!
//! ```text
//! PBKDF2-HMAC-SHA256(
//!     password   = passphrase (UTF-8 bytes, verbatim),
//!     salt       = 16 random bytes stored in the blob,
//!     iterations = 100_000,
//!     dk_len     = 32
//! )
//! ```
//!
//! Nothing is cached. Every encrypt and decrypt pays the full derivation.

use std::num::NonZeroU32;

use ring::pbkdf2;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;

/// Size of the PBKDF2 salt in bytes.
pub const SALT_LEN: usize = 16;

/// The iteration count every vault uses unless configured otherwise.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const DEFAULT_NONZERO: NonZeroU32 = match NonZeroU32::new(DEFAULT_ITERATIONS) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// PBKDF2 cost parameters.
///
/// The blob does not record the iteration count, so every blob must be
/// opened with the same params it was sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: NonZeroU32,
}

impl KdfParams {
    pub fn new(iterations: NonZeroU32) -> Self {
        Self { iterations }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_NONZERO,
        }
    }
}

/// A key derived from a passphrase and salt.
///
/// - Not `Clone`.
/// - Zeroised on drop.
/// - Raw bytes are `pub(crate)` and never leave the crate.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derive the data key for `passphrase` under `salt`.
///
/// Deterministic: decryption re-derives the identical key from the salt
/// stored next to the ciphertext.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN], params: KdfParams) -> DerivedKey {
    let mut bytes = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        params.iterations,
        salt,
        passphrase.as_bytes(),
        &mut bytes,
    );
    DerivedKey { bytes }
}

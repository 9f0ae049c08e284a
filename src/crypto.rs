//! Low-level cryptographic operations.
//!
//! The only module that touches `ring`'s AEAD and RNG types. Everything
//! above works through the functions exposed here.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM (authenticated encryption, 16-byte tag)
//! - **IV**: 96-bit (12 bytes), supplied by the caller, fresh per operation
//! - **Key size**: 256 bits (32 bytes)

use ring::aead::{self, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::VaultError;

const ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of the AES-GCM IV in bytes.
pub const IV_LEN: usize = 12;

/// Size of a derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Fill a fixed-size buffer from the system CSPRNG.
///
/// A failing RNG is an environment problem, never a user error.
pub(crate) fn random_array<const N: usize>() -> Result<[u8; N], VaultError> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; N];
    rng.fill(&mut buf).map_err(|_| VaultError::CryptoUnavailable)?;
    Ok(buf)
}

fn aead_key(key_bytes: &[u8; KEY_LEN]) -> Result<LessSafeKey, VaultError> {
    let unbound = UnboundKey::new(ALGORITHM, key_bytes).map_err(|_| VaultError::CryptoUnavailable)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` with AES-256-GCM and no additional data.
///
/// Returns `ciphertext || tag`. The IV is not included; the caller owns the
/// envelope layout.
pub(crate) fn seal(
    key_bytes: &[u8; KEY_LEN],
    iv: [u8; IV_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let key = aead_key(key_bytes)?;
    let nonce = Nonce::assume_unique_for_key(iv);

    let mut in_out = Vec::with_capacity(plaintext.len() + TAG_LEN);
    in_out.extend_from_slice(plaintext);
    key.seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::CryptoUnavailable)?;

    Ok(in_out)
}

/// Decrypt and verify `ciphertext || tag`.
///
/// A wrong key, a wrong IV, or any modified byte fails the GCM check. The
/// caller receives no partial plaintext.
pub(crate) fn open(
    key_bytes: &[u8; KEY_LEN],
    iv: [u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    if ciphertext.len() < TAG_LEN {
        return Err(VaultError::Decryption);
    }

    let key = aead_key(key_bytes)?;
    let nonce = Nonce::assume_unique_for_key(iv);

    let mut payload = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, aead::Aad::empty(), &mut payload)
        .map_err(|_| VaultError::Decryption)?;

    Ok(plaintext.to_vec())
}

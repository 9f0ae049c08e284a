//! The in-memory unlocked state.

use zeroize::Zeroizing;

use crate::error::VaultError;

/// Holds the assembled passphrase while the vault is unlocked.
///
/// The passphrase is never persisted and is zeroised when the session locks
/// or drops. Not `Clone`.
#[derive(Default)]
pub struct AuthSession {
    passphrase: Option<Zeroizing<String>>,
}

impl AuthSession {
    /// A session with no passphrase.
    pub fn locked() -> Self {
        Self::default()
    }

    /// A session unlocked with `passphrase`. Normally built by the
    /// `AuthStateMachine` once both PIN stages are in.
    pub fn open(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(Zeroizing::new(passphrase.into())),
        }
    }

    pub fn is_open(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Drop the passphrase immediately.
    pub fn lock(&mut self) {
        self.passphrase = None;
    }

    pub(crate) fn passphrase(&self) -> Result<&str, VaultError> {
        self.passphrase
            .as_deref()
            .map(String::as_str)
            .ok_or(VaultError::NotAuthenticated)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("open", &self.is_open())
            .finish()
    }
}

//! Two-stage PIN entry.
//!
//! ```text
//! Unauthorized --stage 1--> Stage1 --stage 2--> Authorized --lock()--> Unauthorized
//! ```
//!
//! The passphrase is `stage1 + stage2`. Reaching `Authorized` runs the
//! legacy migration and then a full vault read; a failed read sends the
//! machine back to `Unauthorized` with the passphrase discarded.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::DEFAULT_PIN_STAGE_LEN;
use crate::error::{VaultError, VaultResult};
use crate::migration::{self, MigrationOutcome};
use crate::session::AuthSession;
use crate::storage::KeyValueStore;
use crate::vault::VaultStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthorized,
    Stage1,
    Authorized,
}

/// Result of feeding PIN input to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProgress {
    /// The current stage is not complete yet.
    Pending { entered: usize },
    /// Stage 1 was accepted; waiting for stage 2.
    AwaitingSecondStage,
    /// Both stages were accepted and the vault decrypted.
    Unlocked(UnlockOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockOutcome {
    /// No vault existed; the passphrase just became the vault passphrase.
    pub setup: bool,
    /// Records moved over from the legacy plaintext store.
    pub migrated: usize,
}

/// Drives PIN entry and owns the resulting session.
///
/// The current state is derived: an open session means `Authorized`, a held
/// stage-1 value means `Stage1`.
pub struct AuthStateMachine {
    stage_len: usize,
    input: Zeroizing<String>,
    stage1: Option<Zeroizing<String>>,
    session: AuthSession,
}

impl Default for AuthStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_PIN_STAGE_LEN)
    }
}

impl AuthStateMachine {
    pub fn new(stage_len: usize) -> Self {
        Self {
            stage_len,
            input: Zeroizing::new(String::new()),
            stage1: None,
            session: AuthSession::locked(),
        }
    }

    pub fn state(&self) -> AuthState {
        if self.session.is_open() {
            AuthState::Authorized
        } else if self.stage1.is_some() {
            AuthState::Stage1
        } else {
            AuthState::Unauthorized
        }
    }

    pub fn stage_len(&self) -> usize {
        self.stage_len
    }

    /// Characters typed into the current stage so far.
    pub fn pending_len(&self) -> usize {
        self.input.chars().count()
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AuthSession {
        &mut self.session
    }

    /// Type one character. When the current stage fills up it is submitted.
    pub fn push_char<S: KeyValueStore>(
        &mut self,
        c: char,
        vault: &mut VaultStore<S>,
    ) -> VaultResult<AuthProgress> {
        if self.session.is_open() {
            return Err(VaultError::AlreadyUnlocked);
        }
        self.input.push(c);
        let entered = self.pending_len();
        if entered < self.stage_len {
            return Ok(AuthProgress::Pending { entered });
        }
        let chunk = std::mem::replace(&mut self.input, Zeroizing::new(String::new()));
        self.submit_stage(&chunk, vault)
    }

    /// Delete the last typed character of the current stage.
    pub fn pop_char(&mut self) -> Option<char> {
        self.input.pop()
    }

    /// Discard typed input and any accepted stage 1.
    pub fn clear_input(&mut self) {
        self.input = Zeroizing::new(String::new());
        self.stage1 = None;
    }

    /// Submit a complete stage.
    ///
    /// A chunk of the wrong length is rejected without changing state.
    pub fn submit_stage<S: KeyValueStore>(
        &mut self,
        chunk: &str,
        vault: &mut VaultStore<S>,
    ) -> VaultResult<AuthProgress> {
        if self.session.is_open() {
            return Err(VaultError::AlreadyUnlocked);
        }
        let found = chunk.chars().count();
        if found != self.stage_len {
            return Err(VaultError::InvalidPinChunk {
                expected: self.stage_len,
                found,
            });
        }

        let Some(stage1) = self.stage1.take() else {
            self.stage1 = Some(Zeroizing::new(chunk.to_string()));
            debug!("pin stage 1 accepted");
            return Ok(AuthProgress::AwaitingSecondStage);
        };

        let mut passphrase = String::with_capacity(stage1.len() + chunk.len());
        passphrase.push_str(&stage1);
        passphrase.push_str(chunk);
        drop(stage1);

        self.authorize(passphrase, vault).map(AuthProgress::Unlocked)
    }

    fn authorize<S: KeyValueStore>(
        &mut self,
        passphrase: String,
        vault: &mut VaultStore<S>,
    ) -> VaultResult<UnlockOutcome> {
        let mut session = AuthSession::open(passphrase);
        let setup = !vault.has_encrypted_blob() && !migration::has_legacy(vault);

        let migrated = match migration::migrate_if_needed(vault, session.passphrase()?)? {
            MigrationOutcome::Migrated { records } => records,
            MigrationOutcome::NotNeeded | MigrationOutcome::SkippedExistingBlob => 0,
        };

        if setup {
            vault.save_passwords(&session, &[])?;
            info!("vault initialised with new passphrase");
        } else if let Err(e) = vault.get_passwords(&mut session) {
            warn!("pin rejected");
            return Err(e);
        }

        self.session = session;
        info!(setup, migrated, "vault unlocked");
        Ok(UnlockOutcome { setup, migrated })
    }

    /// Return to `Unauthorized`, clearing the passphrase and any partial input.
    pub fn lock(&mut self) {
        self.session.lock();
        self.clear_input();
        debug!("vault locked");
    }
}

impl std::fmt::Debug for AuthStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStateMachine")
            .field("state", &self.state())
            .field("stage_len", &self.stage_len)
            .field("pending", &self.pending_len())
            .finish()
    }
}

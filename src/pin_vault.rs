//! Caller-owned vault handle.
//!
//! `PinVault` bundles the store, the PIN state machine and the audit log.
//! There is no global state: the session lives inside the value the caller
//! holds, and dropping it zeroises the passphrase.

use crate::audit::{AuditEvent, AuditLog, AuditSink};
use crate::auth::{AuthProgress, AuthState, AuthStateMachine};
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::model::VaultRecord;
use crate::session::AuthSession;
use crate::storage::KeyValueStore;
use crate::vault::{RecordEdit, VaultStore};

pub struct PinVault<S> {
    vault: VaultStore<S>,
    auth: AuthStateMachine,
    audit: AuditLog,
}

impl<S: KeyValueStore> PinVault<S> {
    pub fn new(store: S, config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self {
            vault: VaultStore::new(store, &config),
            auth: AuthStateMachine::new(config.pin_stage_len),
            audit: AuditLog::new(),
        })
    }

    pub fn state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn is_unlocked(&self) -> bool {
        self.auth.state() == AuthState::Authorized
    }

    pub fn vault(&self) -> &VaultStore<S> {
        &self.vault
    }

    pub fn into_store(self) -> S {
        self.vault.into_store()
    }

    /// The session currently held by the state machine.
    pub fn session(&self) -> &AuthSession {
        self.auth.session()
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn add_audit_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.audit.add_sink(sink);
    }

    /// Characters typed into the current PIN stage.
    pub fn pending_len(&self) -> usize {
        self.auth.pending_len()
    }

    pub fn push_char(&mut self, c: char) -> VaultResult<AuthProgress> {
        let result = self.auth.push_char(c, &mut self.vault);
        self.note_progress(&result);
        result
    }

    pub fn pop_char(&mut self) -> Option<char> {
        self.auth.pop_char()
    }

    pub fn submit_stage(&mut self, chunk: &str) -> VaultResult<AuthProgress> {
        let result = self.auth.submit_stage(chunk, &mut self.vault);
        self.note_progress(&result);
        result
    }

    /// Enter both stages of a PIN in one call.
    ///
    /// Any half-typed input or held first stage is discarded first.
    pub fn unlock(&mut self, stage1: &str, stage2: &str) -> VaultResult<AuthProgress> {
        if self.is_unlocked() {
            return Err(VaultError::AlreadyUnlocked);
        }
        self.auth.clear_input();
        self.submit_stage(stage1)?;
        self.submit_stage(stage2)
    }

    /// Discard typed characters and any accepted first stage.
    pub fn clear_input(&mut self) {
        self.auth.clear_input();
    }

    pub fn lock(&mut self) {
        self.auth.lock();
        self.audit.record(AuditEvent::Locked);
    }

    pub fn records(&mut self) -> VaultResult<Vec<VaultRecord>> {
        let result = self.vault.get_passwords(self.auth.session_mut());
        self.check_read(result)
    }

    pub fn find(&mut self, id: &str) -> VaultResult<Option<VaultRecord>> {
        let result = self.vault.find_record(self.auth.session_mut(), id);
        self.check_read(result)
    }

    /// Replace the whole collection.
    pub fn save(&mut self, records: &[VaultRecord]) -> VaultResult<()> {
        self.vault.save_passwords(self.auth.session(), records)?;
        self.audit.record(AuditEvent::Saved {
            records: records.len(),
        });
        Ok(())
    }

    /// Replace the record with the same id, or append it.
    pub fn upsert(&mut self, record: VaultRecord) -> VaultResult<String> {
        let result = self.vault.upsert_record(self.auth.session_mut(), record);
        self.finish_edit(result)
    }

    /// Append a record, bumping its id if it collides.
    pub fn add(&mut self, record: VaultRecord) -> VaultResult<String> {
        let result = self.vault.add_record(self.auth.session_mut(), record);
        self.finish_edit(result)
    }

    pub fn remove(&mut self, id: &str) -> VaultResult<bool> {
        let result = self.vault.remove_record(self.auth.session_mut(), id);
        self.finish_edit(result)
    }

    fn finish_edit<T>(&mut self, result: VaultResult<RecordEdit<T>>) -> VaultResult<T> {
        let edit = self.check_read(result)?;
        if let Some(records) = edit.saved {
            self.audit.record(AuditEvent::Saved { records });
        }
        Ok(edit.value)
    }

    fn note_progress(&mut self, result: &VaultResult<AuthProgress>) {
        match result {
            Ok(AuthProgress::Unlocked(outcome)) => {
                if outcome.migrated > 0 {
                    self.audit.record(AuditEvent::Migrated {
                        records: outcome.migrated,
                    });
                }
                self.audit.record(AuditEvent::Unlocked {
                    setup: outcome.setup,
                });
            }
            Ok(_) | Err(VaultError::InvalidPinChunk { .. } | VaultError::AlreadyUnlocked) => {}
            Err(_) => self.audit.record(AuditEvent::UnlockFailed),
        }
    }

    fn check_read<T>(&mut self, result: VaultResult<T>) -> VaultResult<T> {
        if matches!(result, Err(VaultError::Decryption)) {
            // The session is already closed; drop any half-typed PIN as well.
            self.auth.lock();
            self.audit.record(AuditEvent::Locked);
        }
        result
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for PinVault<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinVault")
            .field("vault", &self.vault)
            .field("auth", &self.auth)
            .field("audit", &self.audit)
            .finish()
    }
}

//! The encrypted record collection.
//!
//! `VaultStore` owns the backing store and exposes the collection as
//! plaintext to holders of an open `AuthSession`. Every write re-encrypts
//! and replaces the whole blob; there are no partial updates.

use tracing::{debug, warn};

use crate::cipher::CipherService;
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::model::{self, VaultRecord};
use crate::session::AuthSession;
use crate::storage::KeyValueStore;

/// Result of a single-record edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEdit<T> {
    pub value: T,
    /// Size of the collection written, or `None` if nothing was written.
    pub saved: Option<usize>,
}

pub struct VaultStore<S> {
    store: S,
    cipher: CipherService,
    blob_key: String,
    legacy_key: String,
}

impl<S: KeyValueStore> VaultStore<S> {
    pub fn new(store: S, config: &VaultConfig) -> Self {
        Self {
            store,
            cipher: CipherService::new(config.kdf_params()),
            blob_key: config.blob_key.clone(),
            legacy_key: config.legacy_key.clone(),
        }
    }

    pub fn cipher(&self) -> &CipherService {
        &self.cipher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn blob_key(&self) -> &str {
        &self.blob_key
    }

    pub fn legacy_key(&self) -> &str {
        &self.legacy_key
    }

    pub fn has_encrypted_blob(&self) -> bool {
        self.store.contains(&self.blob_key)
    }

    /// Decrypt and return the full collection.
    ///
    /// No stored blob means a fresh vault: the collection is empty and
    /// nothing is decrypted. If decryption or parsing fails the session is
    /// locked before the error is returned; callers must re-authenticate.
    pub fn get_passwords(&self, session: &mut AuthSession) -> VaultResult<Vec<VaultRecord>> {
        let passphrase = session.passphrase()?;
        let Some(blob) = self.store.get(&self.blob_key) else {
            debug!(key = %self.blob_key, "no encrypted blob, returning empty collection");
            return Ok(Vec::new());
        };

        let parsed: VaultResult<Vec<VaultRecord>> = self
            .cipher
            .decrypt(&blob, passphrase)
            .and_then(|json| serde_json::from_str(&json).map_err(|_| VaultError::Decryption));

        match parsed {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("vault read failed, locking session");
                session.lock();
                Err(e)
            }
        }
    }

    /// Encrypt `records` and replace the stored blob.
    ///
    /// A collection with a repeated id is rejected before anything is
    /// written. If the store rejects the write the old blob stays and the
    /// session remains open.
    pub fn save_passwords(&mut self, session: &AuthSession, records: &[VaultRecord]) -> VaultResult<()> {
        let passphrase = session.passphrase()?;
        if let Some(id) = model::first_duplicate_id(records) {
            return Err(VaultError::DuplicateId(id.to_string()));
        }
        let blob = self.seal_records(records, passphrase)?;
        self.store.set(&self.blob_key, &blob)?;
        debug!(records = records.len(), "vault saved");
        Ok(())
    }

    /// Replace the record sharing `record.id`, or append it.
    pub fn upsert_record(
        &mut self,
        session: &mut AuthSession,
        record: VaultRecord,
    ) -> VaultResult<RecordEdit<String>> {
        self.edit_records(session, |records| (model::upsert(records, record), true))
    }

    /// Append a new record, bumping its id if it collides with an existing one.
    pub fn add_record(
        &mut self,
        session: &mut AuthSession,
        mut record: VaultRecord,
    ) -> VaultResult<RecordEdit<String>> {
        self.edit_records(session, |records| {
            model::assign_unique_id(records, &mut record);
            let id = record.id.clone();
            records.push(record);
            (id, true)
        })
    }

    /// Delete the record with `id`. The value is whether anything was removed.
    pub fn remove_record(
        &mut self,
        session: &mut AuthSession,
        id: &str,
    ) -> VaultResult<RecordEdit<bool>> {
        self.edit_records(session, |records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            let removed = records.len() != before;
            (removed, removed)
        })
    }

    /// Read, change and re-save the collection. `change` returns its value
    /// and whether the collection needs writing.
    fn edit_records<T>(
        &mut self,
        session: &mut AuthSession,
        change: impl FnOnce(&mut Vec<VaultRecord>) -> (T, bool),
    ) -> VaultResult<RecordEdit<T>> {
        let mut records = self.get_passwords(session)?;
        let (value, dirty) = change(&mut records);
        if !dirty {
            return Ok(RecordEdit { value, saved: None });
        }
        self.save_passwords(session, &records)?;
        Ok(RecordEdit {
            value,
            saved: Some(records.len()),
        })
    }

    pub fn find_record(&self, session: &mut AuthSession, id: &str) -> VaultResult<Option<VaultRecord>> {
        Ok(self
            .get_passwords(session)?
            .into_iter()
            .find(|r| r.id == id))
    }

    pub(crate) fn seal_records(&self, records: &[VaultRecord], passphrase: &str) -> VaultResult<String> {
        let json = serde_json::to_string(records).map_err(VaultError::Serialization)?;
        self.cipher.encrypt(&json, passphrase)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for VaultStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("store", &self.store)
            .field("blob_key", &self.blob_key)
            .field("legacy_key", &self.legacy_key)
            .finish()
    }
}

//! One-time migration of the legacy plaintext collection.
//!
//! Older versions stored the records as a plaintext JSON array. On the first
//! successful PIN entry that array is encrypted under the new passphrase and
//! the plaintext key is deleted. The delete only happens after the encrypted
//! blob has been written.

use tracing::{info, warn};

use crate::error::{VaultError, VaultResult};
use crate::model::{self, VaultRecord};
use crate::storage::KeyValueStore;
use crate::vault::VaultStore;

/// What `migrate_if_needed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy collection was present.
    NotNeeded,
    /// An encrypted blob already existed; the legacy value was left alone.
    SkippedExistingBlob,
    /// The legacy collection was re-encrypted and removed.
    Migrated { records: usize },
}

/// Whether the store still holds a legacy plaintext collection.
pub fn has_legacy<S: KeyValueStore>(vault: &VaultStore<S>) -> bool {
    vault.store().contains(vault.legacy_key())
}

/// Encrypt the legacy collection under `passphrase`, if there is one.
///
/// Idempotent: once the legacy key is gone, later calls return `NotNeeded`.
/// A failed write leaves the legacy key in place.
pub fn migrate_if_needed<S: KeyValueStore>(
    vault: &mut VaultStore<S>,
    passphrase: &str,
) -> VaultResult<MigrationOutcome> {
    let Some(legacy) = vault.store().get(vault.legacy_key()) else {
        return Ok(MigrationOutcome::NotNeeded);
    };

    if vault.has_encrypted_blob() {
        warn!(
            legacy_key = vault.legacy_key(),
            "legacy collection present next to an encrypted blob, not migrating"
        );
        return Ok(MigrationOutcome::SkippedExistingBlob);
    }

    let mut records: Vec<VaultRecord> =
        serde_json::from_str(&legacy).map_err(VaultError::LegacyData)?;
    let renamed = model::reassign_duplicate_ids(&mut records);
    if renamed > 0 {
        warn!(renamed, "legacy collection repeated record ids, later copies renumbered");
    }
    let blob = vault.seal_records(&records, passphrase)?;

    let blob_key = vault.blob_key().to_string();
    let legacy_key = vault.legacy_key().to_string();
    vault.store_mut().set(&blob_key, &blob)?;
    vault.store_mut().remove(&legacy_key)?;

    info!(records = records.len(), "migrated legacy collection");
    Ok(MigrationOutcome::Migrated {
        records: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::config::VaultConfig;
    use crate::session::AuthSession;
    use crate::storage::MemoryStore;

    const LEGACY: &str = r#"[{"id":"1","name":"Bank","site":"bank.example","email":"","username":"u","password":"p"}]"#;

    fn vault_with(store: MemoryStore) -> VaultStore<MemoryStore> {
        let config = VaultConfig {
            kdf_iterations: NonZeroU32::new(1_000).unwrap(),
            ..VaultConfig::default()
        };
        VaultStore::new(store, &config)
    }

    #[test]
    fn test_no_legacy_is_noop() {
        let mut vault = vault_with(MemoryStore::new());
        assert_eq!(
            migrate_if_needed(&mut vault, "123456").unwrap(),
            MigrationOutcome::NotNeeded
        );
        assert!(!vault.has_encrypted_blob());
    }

    #[test]
    fn test_migrates_and_removes_legacy() {
        let mut store = MemoryStore::new();
        store.set("vault_passwords", LEGACY).unwrap();
        let mut vault = vault_with(store);

        assert_eq!(
            migrate_if_needed(&mut vault, "123456").unwrap(),
            MigrationOutcome::Migrated { records: 1 }
        );
        assert!(!has_legacy(&vault));

        let mut session = AuthSession::open("123456");
        let records = vault.get_passwords(&mut session).unwrap();
        assert_eq!(records[0].site, "bank.example");

        // Second run has nothing left to do.
        assert_eq!(
            migrate_if_needed(&mut vault, "123456").unwrap(),
            MigrationOutcome::NotNeeded
        );
    }

    #[test]
    fn test_unreadable_legacy_is_kept() {
        let mut store = MemoryStore::new();
        store.set("vault_passwords", "{not an array").unwrap();
        let mut vault = vault_with(store);

        assert!(matches!(
            migrate_if_needed(&mut vault, "123456"),
            Err(VaultError::LegacyData(_))
        ));
        assert!(has_legacy(&vault));
    }

    #[test]
    fn test_existing_blob_wins() {
        let mut vault = vault_with(MemoryStore::new());
        vault
            .save_passwords(&AuthSession::open("123456"), &[])
            .unwrap();
        vault.store_mut().set("vault_passwords", LEGACY).unwrap();

        assert_eq!(
            migrate_if_needed(&mut vault, "123456").unwrap(),
            MigrationOutcome::SkippedExistingBlob
        );
        assert!(has_legacy(&vault));
        assert!(vault
            .get_passwords(&mut AuthSession::open("123456"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_repeated_legacy_ids_are_renumbered() {
        let legacy = r#"[{"id":"5","name":"a"},{"id":"5","name":"b"},{"id":"6","name":"c"}]"#;
        let mut store = MemoryStore::new();
        store.set("vault_passwords", legacy).unwrap();
        let mut vault = vault_with(store);

        assert_eq!(
            migrate_if_needed(&mut vault, "123456").unwrap(),
            MigrationOutcome::Migrated { records: 3 }
        );
        let records = vault.get_passwords(&mut AuthSession::open("123456")).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["5", "7", "6"]);
        assert_eq!(records[1].name, "b");
    }
}

use std::num::NonZeroU32;

use pinvault::{
    AuthProgress, AuthSession, AuthState, FileStore, KeyValueStore, MemoryStore, PinVault,
    UnlockOutcome, VaultConfig, VaultError, VaultRecord, VaultStore,
};

fn config() -> VaultConfig {
    VaultConfig {
        kdf_iterations: NonZeroU32::new(1_000).unwrap(),
        ..VaultConfig::default()
    }
}

fn bank() -> VaultRecord {
    VaultRecord {
        id: "1".into(),
        name: "Bank".into(),
        site: "bank.example".into(),
        email: String::new(),
        username: "u".into(),
        password: "p".into(),
    }
}

#[test]
fn test_first_use_sets_passphrase() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();

    let progress = vault.unlock("abc", "def").unwrap();
    assert_eq!(
        progress,
        AuthProgress::Unlocked(UnlockOutcome {
            setup: true,
            migrated: 0
        })
    );
    assert!(vault.records().unwrap().is_empty());

    // The passphrase is now permanent: a different PIN is refused.
    vault.lock();
    assert!(matches!(
        vault.unlock("abc", "xyz"),
        Err(VaultError::Decryption)
    ));
    assert_eq!(vault.state(), AuthState::Unauthorized);
}

#[test]
fn test_bank_record_survives_reopen() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("abc", "def").unwrap();
    vault.save(&[bank()]).unwrap();
    let before = serde_json::to_string(&vault.records().unwrap()).unwrap();

    // Reopen from the persisted store with a fresh handle.
    let store = vault.into_store();
    let mut reopened = PinVault::new(store, config()).unwrap();
    let progress = reopened.unlock("abc", "def").unwrap();
    assert!(matches!(
        progress,
        AuthProgress::Unlocked(UnlockOutcome { setup: false, .. })
    ));

    let after = serde_json::to_string(&reopened.records().unwrap()).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        after,
        r#"[{"id":"1","name":"Bank","site":"bank.example","email":"","username":"u","password":"p"}]"#
    );
}

#[test]
fn test_stage_concatenation_matches_direct_passphrase() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();
    vault.save(&[bank()]).unwrap();

    // The blob written through the two-stage flow opens with the joined string.
    let store = vault.into_store();
    let direct = VaultStore::new(store, &config());
    let mut session = AuthSession::open("123456");
    assert_eq!(direct.get_passwords(&mut session).unwrap(), vec![bank()]);
}

#[test]
fn test_lock_hides_records() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();
    vault.save(&[bank()]).unwrap();
    assert_eq!(vault.records().unwrap().len(), 1);

    vault.lock();
    assert!(!vault.session().is_open());
    assert!(matches!(vault.records(), Err(VaultError::NotAuthenticated)));
    assert!(matches!(vault.save(&[]), Err(VaultError::NotAuthenticated)));
    assert!(matches!(vault.upsert(bank()), Err(VaultError::NotAuthenticated)));

    // Nothing was overwritten while locked.
    vault.unlock("123", "456").unwrap();
    assert_eq!(vault.records().unwrap(), vec![bank()]);
}

#[test]
fn test_lock_during_stage_one_discards_it() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.submit_stage("123").unwrap();
    assert_eq!(vault.state(), AuthState::Stage1);

    vault.lock();
    assert_eq!(vault.state(), AuthState::Unauthorized);
    assert_eq!(
        vault.submit_stage("456").unwrap(),
        AuthProgress::AwaitingSecondStage
    );
}

#[test]
fn test_unlock_discards_partial_entry() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.submit_stage("999").unwrap();
    vault.push_char('7').unwrap();

    let progress = vault.unlock("123", "456").unwrap();
    assert_eq!(
        progress,
        AuthProgress::Unlocked(UnlockOutcome {
            setup: true,
            migrated: 0
        })
    );
    assert_eq!(vault.pending_len(), 0);

    // The vault was created under the PIN passed to `unlock`.
    let store = vault.into_store();
    let reader = VaultStore::new(store, &config());
    assert!(reader.get_passwords(&mut AuthSession::open("123456")).is_ok());
    assert!(matches!(
        reader.get_passwords(&mut AuthSession::open("999123")),
        Err(VaultError::Decryption)
    ));
}

#[test]
fn test_unlock_while_unlocked_is_rejected() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();
    assert!(matches!(
        vault.unlock("123", "456"),
        Err(VaultError::AlreadyUnlocked)
    ));
    assert!(vault.is_unlocked());
}

#[test]
fn test_save_rejects_repeated_ids() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();
    vault.save(&[bank()]).unwrap();

    assert!(matches!(
        vault.save(&[bank(), bank()]),
        Err(VaultError::DuplicateId(id)) if id == "1"
    ));
    assert_eq!(vault.records().unwrap(), vec![bank()]);
    assert!(vault.is_unlocked());
}

#[test]
fn test_corrupted_blob_forces_lock() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();
    vault.save(&[bank()]).unwrap();

    // Corrupt one character of the stored blob.
    let mut store = vault.into_store();
    let blob = store.get("vault_passwords_encrypted").unwrap();
    let mut bytes = blob.into_bytes();
    bytes[10] = if bytes[10] == b'A' { b'B' } else { b'A' };
    store
        .set("vault_passwords_encrypted", std::str::from_utf8(&bytes).unwrap())
        .unwrap();

    let mut vault = PinVault::new(store, config()).unwrap();
    assert!(matches!(
        vault.unlock("123", "456"),
        Err(VaultError::Decryption)
    ));
    assert_eq!(vault.state(), AuthState::Unauthorized);
    assert!(matches!(vault.records(), Err(VaultError::NotAuthenticated)));
}

#[test]
fn test_typing_pin_character_by_character() {
    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    let mut last = None;
    for c in "987654".chars() {
        last = Some(vault.push_char(c).unwrap());
    }
    assert!(matches!(last, Some(AuthProgress::Unlocked(_))));
    assert!(vault.is_unlocked());
}

#[test]
fn test_record_edits_through_handle() {
    use pinvault::audit::AuditEvent;

    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();

    vault.upsert(bank()).unwrap();
    let mut changed = bank();
    changed.password = "new".into();
    vault.upsert(changed).unwrap();
    let mail = VaultRecord::new("Mail", "mail.example", "me@mail.example", "me", "pw");
    let mail_id = vault.add(mail).unwrap();

    let records = vault.records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].password, "new");
    assert_eq!(vault.find(&mail_id).unwrap().unwrap().name, "Mail");

    assert!(vault.remove("1").unwrap());
    assert!(!vault.remove("1").unwrap());
    assert_eq!(vault.records().unwrap().len(), 1);

    // Every write is logged with the size of the collection written; the
    // second removal wrote nothing.
    let saved: Vec<_> = vault
        .audit_log()
        .iter()
        .filter_map(|r| match r.event {
            AuditEvent::Saved { records } => Some(records),
            _ => None,
        })
        .collect();
    assert_eq!(saved, [1, 1, 2, 1]);
}

#[test]
fn test_file_store_vault_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.json");

    {
        let mut vault = PinVault::new(FileStore::open(&path).unwrap(), config()).unwrap();
        vault.unlock("abc", "def").unwrap();
        vault.save(&[bank()]).unwrap();
    }

    let mut vault = PinVault::new(FileStore::open(&path).unwrap(), config()).unwrap();
    vault.unlock("abc", "def").unwrap();
    assert_eq!(vault.records().unwrap(), vec![bank()]);

    // The passphrase never reaches disk.
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(!on_disk.contains("abcdef"));
    assert!(!on_disk.contains("bank.example"));
}

#[test]
fn test_audit_log_records_session_events() {
    use pinvault::audit::AuditEvent;

    let mut vault = PinVault::new(MemoryStore::new(), config()).unwrap();
    vault.unlock("123", "456").unwrap();
    vault.save(&[bank()]).unwrap();
    vault.lock();
    let _ = vault.unlock("123", "000");

    let events: Vec<_> = vault.audit_log().iter().map(|r| r.event.clone()).collect();
    assert_eq!(
        events,
        vec![
            AuditEvent::Unlocked { setup: true },
            AuditEvent::Saved { records: 1 },
            AuditEvent::Locked,
            AuditEvent::UnlockFailed,
        ]
    );
}

//! Minimal example: a PIN vault persisted to a JSON file.
//!
//! Run with: `RUST_LOG=pinvault=debug cargo run --example pin_unlock_demo`
//!
//! - The first run sets up the vault under PIN "abc" + "def"
//! - Later runs unlock it and list the stored records
//! - Session events are appended to an audit file next to the store

use pinvault::audit::FileAuditSink;
use pinvault::{AuthProgress, FileStore, PinVault, VaultConfig, VaultRecord};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Open the store
    let dir = std::env::temp_dir();
    let store = FileStore::open(dir.join("pinvault_demo.json"))?;
    let mut vault = PinVault::new(store, VaultConfig::default())?;
    vault.add_audit_sink(Box::new(FileAuditSink::new(dir.join("pinvault_audit.jsonl"))?));

    // 2. Enter the PIN in two stages
    vault.submit_stage("abc")?;
    let AuthProgress::Unlocked(outcome) = vault.submit_stage("def")? else {
        return Err("vault did not unlock".into());
    };

    // 3. Seed on first use, then list
    if outcome.setup {
        println!("New vault created");
        vault.add(VaultRecord::new("Bank", "bank.example", "", "u", "p"))?;
    }
    for record in vault.records()? {
        println!("{} ({}) user={}", record.name, record.site, record.username);
    }

    // 4. Lock; the passphrase is dropped
    vault.lock();
    println!("Locked: {:?}", vault.state());
    Ok(())
}

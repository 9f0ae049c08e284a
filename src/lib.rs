//! # pinvault
//!
//! PIN-protected credential vault.
//!
//! A six-character PIN is entered as two three-character stages. The joined
//! passphrase is stretched with PBKDF2-HMAC-SHA256 and the record
//! collection is sealed with AES-256-GCM into a single base64 blob held in
//! an opaque key-value store. A legacy plaintext collection, if present, is
//! migrated on the first successful unlock.
//!
//! ## Public API
//!
//! Most callers only need [`PinVault`]. The layers underneath
//! ([`VaultStore`], [`CipherService`], [`keys::derive_key`]) are public for
//! callers that manage their own session.

pub mod audit;
pub mod auth;
pub mod cipher;
pub mod config;
pub(crate) mod crypto;
pub mod error;
pub mod keys;
pub mod migration;
pub mod model;
pub mod pin_vault;
pub mod session;
pub mod storage;
pub mod vault;

pub use auth::{AuthProgress, AuthState, AuthStateMachine, UnlockOutcome};
pub use cipher::{hash_password, CipherService};
pub use config::VaultConfig;
pub use crypto::{IV_LEN, KEY_LEN, TAG_LEN};
pub use error::{VaultError, VaultResult};
pub use keys::{KdfParams, SALT_LEN};
pub use migration::{migrate_if_needed, MigrationOutcome};
pub use model::VaultRecord;
pub use pin_vault::PinVault;
pub use session::AuthSession;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use vault::{RecordEdit, VaultStore};

//! Credential records.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One stored site credential.
///
/// Missing fields in stored JSON read back as empty strings.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultRecord {
    pub id: String,
    pub name: String,
    pub site: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl VaultRecord {
    /// Build a record with a fresh timestamp id.
    pub fn new(
        name: impl Into<String>,
        site: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: Utc::now().timestamp_millis().to_string(),
            name: name.into(),
            site: site.into(),
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for VaultRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("site", &self.site)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Replace the record with the same id in place, or append `record`.
///
/// Returns the record's id.
pub(crate) fn upsert(records: &mut Vec<VaultRecord>, record: VaultRecord) -> String {
    if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
        let id = record.id.clone();
        *existing = record;
        return id;
    }
    let id = record.id.clone();
    records.push(record);
    id
}

/// Give `record` an id not used by any of `records`.
///
/// Numeric ids count upward from their current value; anything else starts
/// from the current timestamp.
pub(crate) fn assign_unique_id(records: &[VaultRecord], record: &mut VaultRecord) {
    let taken = |id: &str| records.iter().any(|r| r.id == id);
    if record.id.is_empty() || taken(&record.id) {
        let mut candidate: i64 = record
            .id
            .parse()
            .unwrap_or_else(|_| Utc::now().timestamp_millis());
        while taken(&candidate.to_string()) {
            candidate = candidate
                .checked_add(1)
                .unwrap_or_else(|| Utc::now().timestamp_millis());
        }
        record.id = candidate.to_string();
    }
}

/// Give every repeat of an earlier id a fresh one. Returns how many records
/// were renumbered.
pub(crate) fn reassign_duplicate_ids(records: &mut [VaultRecord]) -> usize {
    let mut renamed = 0;
    for i in 1..records.len() {
        if records[..i].iter().any(|r| r.id == records[i].id) {
            let mut record = std::mem::take(&mut records[i]);
            assign_unique_id(records, &mut record);
            records[i] = record;
            renamed += 1;
        }
    }
    renamed
}

/// The first id that occurs more than once in `records`.
pub(crate) fn first_duplicate_id(records: &[VaultRecord]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .map(|r| r.id.as_str())
        .find(|id| !seen.insert(*id))
}

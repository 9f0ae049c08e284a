//! Session audit trail.
//!
//! Records unlocks, failed unlocks, locks, migrations and saves. Records
//! carry counts and timestamps only, never passphrases or record contents.
//! Supports pluggable sinks for forwarding records to a file or elsewhere.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Receives a copy of every audit record.
pub trait AuditSink: Send {
    fn append(&mut self, record: AuditRecord);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    Unlocked { setup: bool },
    UnlockFailed,
    Migrated { records: usize },
    Saved { records: usize },
    Locked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(flatten)]
    pub event: AuditEvent,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn now(event: AuditEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only in-memory log with optional forward sinks.
#[derive(Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    pub fn record(&mut self, event: AuditEvent) {
        let record = AuditRecord::now(event);
        for sink in &mut self.sinks {
            sink.append(record.clone());
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&AuditRecord> {
        self.records.last()
    }
}

/// Writes records as JSON lines, appending to the file.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(e) = writeln!(self.file, "{line}").and_then(|()| self.file.flush()) {
                    tracing::warn!(error = %e, "audit sink write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "audit record encoding failed"),
        }
    }
}

//! In-memory, unbounded audit log appended to on every `generate` call.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub provider: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost: Option<f64>,
    pub duration: Option<std::time::Duration>,
}

/// Grows without bound for the life of the client — callers that run many
/// generations over a long-lived process should call [`AuditLog::clear`]
/// periodically.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: AuditEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

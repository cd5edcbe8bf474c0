//! Audit log
//!
//! Appends one JSON line per optimizer event for compliance and debugging.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Entry in the audit log
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub entry_type: &'static str,
    pub details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: &'static str,
}

impl AuditEntry {
    pub fn success(run_id: Uuid, entry_type: &'static str, details: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            entry_type,
            details: truncate(details),
            error: None,
            status: "success",
        }
    }

    pub fn failure(run_id: Uuid, entry_type: &'static str, error: impl ToString) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            entry_type,
            details: Value::Null,
            error: Some(error.to_string()),
            status: "error",
        }
    }
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// JSONL audit trail. Cloning shares the underlying file.
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter { path: path.into() })),
        }
    }

    /// Append an entry. Write failures are logged, never returned.
    pub async fn record(&self, entry: &AuditEntry) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(
                error = %e,
                path = %writer.path.display(),
                "Failed to write audit log entry"
            );
        }
    }
}

/// Cap large payloads (full market dumps) in the log
fn truncate(details: Value) -> Value {
    const MAX_LEN: usize = 4000;
    let s = serde_json::to_string(&details).unwrap_or_default();
    if s.len() > MAX_LEN {
        let cut = (0..=MAX_LEN).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
        Value::String(format!("{}... [truncated]", &s[..cut]))
    } else {
        details
    }
}

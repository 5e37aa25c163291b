//! Execution audit log
//!
//! Every accepted request is recorded before its plugin runs. If the record
//! cannot be written the request is aborted, so the log is a complete list
//! of everything that was executed.
//!
//! The file is opened, appended and closed per event. Each event is written
//! as one complete line with a single `write_all` under a process-wide lock,
//! so concurrent requests never interleave partial lines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::dispatch::DispatchRequest;
use crate::error::{DispatchError, Result};

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub loader: String,
    pub plugin: String,
    pub text: String,
}

impl AuditEvent {
    /// Capture the audit-relevant fields of `request` at `timestamp`.
    pub fn from_request(request: &DispatchRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            user: request.requesting_user().unwrap_or_default().to_string(),
            loader: request.loader().to_string(),
            plugin: request.plugin().to_string(),
            text: request.raw_text().unwrap_or_default().to_string(),
        }
    }

    /// Render as a single newline-terminated line.
    ///
    /// Line breaks inside fields are flattened to spaces.
    pub fn to_line(&self) -> String {
        format!(
            "Time: [{}] :: User: [ {} ] attempted to use loader: [ {} ] to execute plugin: [ {} ] with args: [ {} ]\n",
            self.timestamp.format("%A, %d-%b-%y %H:%M:%S UTC"),
            single_line(&self.user),
            single_line(&self.loader),
            single_line(&self.plugin),
            single_line(&self.text),
        )
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_event(&self, event: &AuditEvent) -> Result<()>;
}

/// Append-only audit file.
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record_event(&self, event: &AuditEvent) -> Result<()> {
        let line = event.to_line();
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                DispatchError::Audit(format!(
                    "Error opening {} for append: {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            DispatchError::Audit(format!("Error writing to {}: {}", self.path.display(), e))
        })?;
        file.flush().await.map_err(|e| {
            DispatchError::Audit(format!("Error flushing {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }
}

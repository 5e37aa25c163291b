//! Error types for the dispatcher
//!
//! This module defines all error types used throughout the dispatch pipeline.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for dispatch operations.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Malformed request: empty plugin, unknown loader, unsafe plugin name.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The audit log could not be opened or written. Execution must not proceed.
    #[error("Audit error: {0}")]
    Audit(String),

    /// The plugin process could not be started or exited unsuccessfully.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The plugin process outlived its deadline and was killed.
    #[error("Plugin {plugin} timed out after {secs}s")]
    Timeout {
        /// Plugin file name as requested.
        plugin: String,
        /// Deadline that expired, in seconds.
        secs: u64,
    },

    /// The failure webhook could not be delivered.
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration-related errors (invalid config, bad overrides, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics emitter setup errors
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Security violations (path traversal attempts in plugin names, etc.)
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DispatchError {
    /// Whether the error is the caller's fault (maps to a 400-class response).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DispatchError::InvalidRequest(_) | DispatchError::SecurityViolation(_)
        )
    }
}

/// A specialized `Result` type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

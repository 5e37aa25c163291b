//! User-facing text for every delivery channel.
//!
//! Direct HTTP responses get plain strings; the failure webhook gets a JSON
//! object whose `text` field carries the plugin output in a code fence.

use serde_json::{json, Value};

/// Body of every 400 response. Deliberately says nothing about why.
pub const REJECTION_MESSAGE: &str = "Plugin request not in appropriate format.\n";

/// Body returned when the audit record could not be written.
pub const AUDIT_FAILURE_MESSAGE: &str =
    "Error opening or writing plugin execution to log. Aborting. Please contact the operators.\n";

/// Immediate reply in interactive mode.
pub fn acknowledgment(plugin: &str) -> String {
    format!(
        "Executing plugin: {}. It should send additional output shortly...\n",
        plugin
    )
}

/// Log line for a detached run that exited cleanly.
pub fn format_success(plugin: &str, raw_text: Option<&str>) -> String {
    format!(
        "Plugin {} ran with args: {} -- successfully",
        plugin,
        raw_text.unwrap_or_default()
    )
}

/// Body of the 500 response for a failed job-runner run.
pub fn format_sync_failure(plugin: &str) -> String {
    format!("Failure executing {}.", plugin)
}

/// Chat-facing text for a failed detached run.
pub fn format_failure(output: &str) -> String {
    format!("exception or error occurred in plugin:\n```{}```", output)
}

/// Webhook payload for a failed detached run: `{"text": "..."}`.
///
/// Serialising through `serde_json` escapes quotes (`"` → `\"`), newlines
/// and backslashes, so arbitrary plugin output cannot break the payload.
pub fn failure_payload(output: &str) -> Value {
    json!({ "text": format_failure(output) })
}

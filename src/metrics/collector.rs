//! In-process counters.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Terminal state of one dispatched request, for outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcomeKind {
    Rejected,
    AuditFailed,
    SyncSucceeded,
    SyncFailed,
    AsyncSucceeded,
    AsyncFailed,
}

impl DispatchOutcomeKind {
    pub const ALL: [DispatchOutcomeKind; 6] = [
        DispatchOutcomeKind::Rejected,
        DispatchOutcomeKind::AuditFailed,
        DispatchOutcomeKind::SyncSucceeded,
        DispatchOutcomeKind::SyncFailed,
        DispatchOutcomeKind::AsyncSucceeded,
        DispatchOutcomeKind::AsyncFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcomeKind::Rejected => "rejected",
            DispatchOutcomeKind::AuditFailed => "audit_failed",
            DispatchOutcomeKind::SyncSucceeded => "sync_ok",
            DispatchOutcomeKind::SyncFailed => "sync_failed",
            DispatchOutcomeKind::AsyncSucceeded => "async_ok",
            DispatchOutcomeKind::AsyncFailed => "async_failed",
        }
    }
}

/// Thread-safe counters shared by all requests.
#[derive(Debug)]
pub struct MetricsCollector {
    plugin_counts: Mutex<HashMap<String, u64>>,
    outcome_counts: Mutex<HashMap<DispatchOutcomeKind, u64>>,
    started: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            plugin_counts: Mutex::new(HashMap::new()),
            outcome_counts: Mutex::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    /// Count one invocation of the plugin counter `name`.
    pub fn increment(&self, name: &str) {
        if let Ok(mut counts) = self.plugin_counts.lock() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_outcome(&self, outcome: DispatchOutcomeKind) {
        if let Ok(mut counts) = self.outcome_counts.lock() {
            *counts.entry(outcome).or_insert(0) += 1;
        }
    }

    pub fn plugin_count(&self, name: &str) -> u64 {
        self.plugin_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(name).copied())
            .unwrap_or(0)
    }

    pub fn outcome_count(&self, outcome: DispatchOutcomeKind) -> u64 {
        self.outcome_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(&outcome).copied())
            .unwrap_or(0)
    }

    /// Snapshot of all plugin counters.
    pub fn all_plugin_counts(&self) -> HashMap<String, u64> {
        self.plugin_counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

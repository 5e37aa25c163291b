//! Telemetry rendering for MetricsCollector.
//!
//! Renders dispatch counters in Prometheus text exposition format or JSON.
//! This module provides only rendering functions; the gateway serves them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::collector::{DispatchOutcomeKind, MetricsCollector};

/// Telemetry output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryFormat {
    #[default]
    Prometheus,
    Json,
}

impl TelemetryFormat {
    /// Parse a `?format=` query value, falling back to Prometheus.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => TelemetryFormat::Json,
            _ => TelemetryFormat::Prometheus,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TelemetryFormat::Prometheus => "text/plain; version=0.0.4",
            TelemetryFormat::Json => "application/json",
        }
    }
}

/// Dispatches to the correct renderer based on the requested format.
pub fn render(collector: &MetricsCollector, format: &TelemetryFormat) -> String {
    match format {
        TelemetryFormat::Prometheus => render_prometheus(collector),
        TelemetryFormat::Json => render_json(collector),
    }
}

/// Renders all counters in Prometheus text exposition format.
///
/// Metric families emitted:
/// - `chatops_dispatch_plugin_invocations_total` (counter, `plugin` label)
/// - `chatops_dispatch_outcomes_total` (counter, `outcome` label)
/// - `chatops_dispatch_uptime_seconds` (gauge)
pub fn render_prometheus(collector: &MetricsCollector) -> String {
    let mut out = String::new();

    // BTreeMap for deterministic ordering.
    let plugins: BTreeMap<_, _> = collector.all_plugin_counts().into_iter().collect();

    out.push_str(
        "# HELP chatops_dispatch_plugin_invocations_total Accepted plugin invocations.\n",
    );
    out.push_str("# TYPE chatops_dispatch_plugin_invocations_total counter\n");
    for (name, count) in &plugins {
        out.push_str(&format!(
            "chatops_dispatch_plugin_invocations_total{{plugin=\"{}\"}} {}\n",
            escape_label(name),
            count,
        ));
    }

    out.push_str("# HELP chatops_dispatch_outcomes_total Requests by terminal state.\n");
    out.push_str("# TYPE chatops_dispatch_outcomes_total counter\n");
    for outcome in DispatchOutcomeKind::ALL {
        out.push_str(&format!(
            "chatops_dispatch_outcomes_total{{outcome=\"{}\"}} {}\n",
            outcome.as_str(),
            collector.outcome_count(outcome),
        ));
    }

    out.push_str("# HELP chatops_dispatch_uptime_seconds Process uptime in seconds.\n");
    out.push_str("# TYPE chatops_dispatch_uptime_seconds gauge\n");
    out.push_str(&format!(
        "chatops_dispatch_uptime_seconds {:.6}\n",
        collector.uptime().as_secs_f64(),
    ));

    out
}

/// Renders all counters as a JSON string.
///
/// ```json
/// {
///   "plugins": { "deploy": 3 },
///   "outcomes": { "rejected": 0, "sync_ok": 1, ... },
///   "uptime_seconds": 45.0
/// }
/// ```
pub fn render_json(collector: &MetricsCollector) -> String {
    let plugins: BTreeMap<_, _> = collector.all_plugin_counts().into_iter().collect();
    let outcomes: BTreeMap<&str, u64> = DispatchOutcomeKind::ALL
        .iter()
        .map(|o| (o.as_str(), collector.outcome_count(*o)))
        .collect();

    let root = serde_json::json!({
        "plugins": plugins,
        "outcomes": outcomes,
        "uptime_seconds": collector.uptime().as_secs_f64(),
    });

    root.to_string()
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

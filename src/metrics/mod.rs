//! Usage metrics
//!
//! `MetricsSink` is the counter interface the dispatch engine talks to.
//! `Metrics` is the production sink: it always counts in-process (served at
//! `GET /metrics`) and forwards plugin counters to StatsD when configured.

pub mod collector;
pub mod statsd;
pub mod telemetry;

use std::sync::Arc;

use tracing::warn;

use crate::config::MetricsConfig;

pub use collector::{DispatchOutcomeKind, MetricsCollector};
pub use statsd::StatsdEmitter;
pub use telemetry::{render, render_json, render_prometheus, TelemetryFormat};

/// Counter interface used by the engine. Must be cheap and never fail.
pub trait MetricsSink: Send + Sync {
    /// Increment the usage counter for a plugin (extension already stripped).
    fn increment_counter(&self, name: &str);

    /// Record a request's terminal state. Kept local, not sent to StatsD.
    fn record_outcome(&self, _outcome: DispatchOutcomeKind) {}
}

/// In-process collector plus optional StatsD forwarding.
#[derive(Debug, Clone)]
pub struct Metrics {
    collector: Arc<MetricsCollector>,
    statsd: Option<Arc<StatsdEmitter>>,
}

impl Metrics {
    /// Metrics that never leave the process.
    pub fn local() -> Self {
        Self {
            collector: Arc::new(MetricsCollector::new()),
            statsd: None,
        }
    }

    /// Build from config. A StatsD address that cannot be set up is logged
    /// and skipped; local counting keeps working.
    pub async fn from_config(config: &MetricsConfig) -> Self {
        let statsd = match config.statsd_address.as_deref() {
            Some(address) => match StatsdEmitter::connect(address, &config.prefix).await {
                Ok(emitter) => Some(Arc::new(emitter)),
                Err(e) => {
                    warn!(error = %e, "StatsD disabled");
                    None
                }
            },
            None => None,
        };

        Self {
            collector: Arc::new(MetricsCollector::new()),
            statsd,
        }
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.collector)
    }
}

impl MetricsSink for Metrics {
    fn increment_counter(&self, name: &str) {
        self.collector.increment(name);
        if let Some(statsd) = &self.statsd {
            statsd.increment(name);
        }
    }

    fn record_outcome(&self, outcome: DispatchOutcomeKind) {
        self.collector.record_outcome(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_metrics_count() {
        let metrics = Metrics::local();
        metrics.increment_counter("deploy");
        metrics.record_outcome(DispatchOutcomeKind::Rejected);

        let collector = metrics.collector();
        assert_eq!(collector.plugin_count("deploy"), 1);
        assert_eq!(collector.outcome_count(DispatchOutcomeKind::Rejected), 1);
    }

    #[tokio::test]
    async fn test_from_config_without_statsd() {
        let metrics = Metrics::from_config(&MetricsConfig::default()).await;
        metrics.increment_counter("run");
        assert_eq!(metrics.collector().plugin_count("run"), 1);
    }

    #[tokio::test]
    async fn test_from_config_bad_statsd_falls_back() {
        let config = MetricsConfig {
            statsd_address: Some("not an address".to_string()),
            ..MetricsConfig::default()
        };
        let metrics = Metrics::from_config(&config).await;
        metrics.increment_counter("run");
        assert_eq!(metrics.collector().plugin_count("run"), 1);
    }
}

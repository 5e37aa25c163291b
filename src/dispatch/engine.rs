//! Dispatch engine
//!
//! Drives one request through validate → prepare → audit → meter → execute.
//!
//! - Job-runner requests (`jobRunnerCallback` present) run inline and the
//!   plugin output is the response.
//! - Interactive requests are acknowledged immediately; the plugin runs on a
//!   detached task and failures are reported to `responseCallback`.
//!
//! Nothing is retried. A rejected request is never audited, counted or run,
//! and no plugin runs unless its audit record was written first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn, Instrument, Span};

use crate::audit::{AuditEvent, AuditSink};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::loaders::LoaderRegistry;
use crate::metrics::{DispatchOutcomeKind, MetricsSink};
use crate::notify::FailureNotifier;
use crate::report;

use super::args::translate;
use super::command::{build, metric_name, plugin_path, validate_plugin_name};
use super::executor::PluginExecutor;
use super::types::{
    AsyncCompletion, DispatchOutcome, DispatchRequest, ExecutionResult, PluginInvocation,
};

/// Where plugins live and how long they may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub plugin_root: PathBuf,
    pub sync_timeout: Duration,
    pub background_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            plugin_root: config.plugin_root.clone(),
            sync_timeout: Duration::from_secs(config.sync_timeout_secs),
            background_timeout: Duration::from_secs(config.background_timeout_secs),
        }
    }
}

/// External collaborators the engine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn PluginExecutor>,
    pub audit: Arc<dyn AuditSink>,
    pub metrics: Arc<dyn MetricsSink>,
    pub notifier: Arc<dyn FailureNotifier>,
}

struct EngineInner {
    registry: LoaderRegistry,
    settings: EngineSettings,
    collaborators: Collaborators,
}

/// The command dispatch engine. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct DispatchEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("loaders", &self.inner.registry.ids())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl DispatchEngine {
    pub fn new(
        registry: LoaderRegistry,
        settings: EngineSettings,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry,
                settings,
                collaborators,
            }),
        }
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    /// Validate `request` and resolve the exact argv it would run.
    ///
    /// Pure: nothing is audited, counted or spawned.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty plugin or unknown loader,
    /// `SecurityViolation` for a plugin name that is not a bare file name.
    pub fn plan(&self, request: &DispatchRequest) -> Result<PluginInvocation> {
        validate_plugin_name(request.plugin())?;

        let descriptor = self.inner.registry.resolve(request.loader()).ok_or_else(|| {
            DispatchError::InvalidRequest(format!("unsupported loader '{}'", request.loader()))
        })?;

        let args = translate(descriptor.argument_style(), request.parameters());
        let path = plugin_path(
            &self.inner.settings.plugin_root,
            descriptor.id(),
            request.plugin(),
        );
        Ok(build(descriptor, &path, args))
    }

    /// Run the full pipeline for one request.
    ///
    /// The returned outcome maps to exactly one response. For interactive
    /// requests the plugin keeps running on a detached task after this
    /// returns; callers may drop the handle in `DispatchOutcome::Accepted`.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchOutcome {
        let inner = &self.inner;
        let collaborators = &inner.collaborators;

        let invocation = match self.plan(&request) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(
                    plugin = %request.plugin(),
                    loader = %request.loader(),
                    error = %e,
                    "Rejected plugin request"
                );
                collaborators
                    .metrics
                    .record_outcome(DispatchOutcomeKind::Rejected);
                return DispatchOutcome::Rejected {
                    message: report::REJECTION_MESSAGE.to_string(),
                };
            }
        };

        let event = AuditEvent::from_request(&request, Utc::now());
        if let Err(e) = collaborators.audit.record_event(&event).await {
            error!(error = %e, "Error logging event, aborted execution");
            collaborators
                .metrics
                .record_outcome(DispatchOutcomeKind::AuditFailed);
            return DispatchOutcome::AuditFailed {
                message: report::AUDIT_FAILURE_MESSAGE.to_string(),
            };
        }

        collaborators
            .metrics
            .increment_counter(&metric_name(request.plugin()));

        if request.is_synchronous() {
            return self.run_inline(request, invocation).await;
        }

        let acknowledgment = report::acknowledgment(request.plugin());
        let task_inner = Arc::clone(inner);
        let completion = tokio::spawn(
            run_detached(task_inner, request, invocation).instrument(Span::current()),
        );

        DispatchOutcome::Accepted {
            acknowledgment,
            completion,
        }
    }

    async fn run_inline(
        &self,
        request: DispatchRequest,
        invocation: PluginInvocation,
    ) -> DispatchOutcome {
        let inner = &self.inner;
        info!(
            plugin = %request.plugin(),
            command = %invocation,
            "Executing plugin for job runner"
        );

        // Runs on its own task so a caller hanging up cannot kill an audited run.
        let executor = Arc::clone(&inner.collaborators.executor);
        let plugin = request.plugin().to_string();
        let deadline = inner.settings.sync_timeout;
        let run = tokio::spawn(
            async move { executor.execute(&plugin, &invocation, deadline).await }
                .instrument(Span::current()),
        );
        let result = match run.await {
            Ok(result) => result,
            Err(e) => {
                let err = DispatchError::Execution(format!("plugin task failed: {}", e));
                ExecutionResult::failure(Vec::new(), err.to_string())
            }
        };

        if result.succeeded {
            info!(plugin = %request.plugin(), "Job runner plugin completed");
            inner
                .collaborators
                .metrics
                .record_outcome(DispatchOutcomeKind::SyncSucceeded);
        } else {
            error!(
                plugin = %request.plugin(),
                reason = %result.failure_detail.as_deref().unwrap_or_default(),
                output = %result.output_lossy(),
                "Failure executing plugin for job runner"
            );
            inner
                .collaborators
                .metrics
                .record_outcome(DispatchOutcomeKind::SyncFailed);
        }

        DispatchOutcome::Sync {
            plugin: request.plugin().to_string(),
            result,
        }
    }
}

async fn run_detached(
    inner: Arc<EngineInner>,
    request: DispatchRequest,
    invocation: PluginInvocation,
) -> AsyncCompletion {
    let collaborators = &inner.collaborators;
    info!(plugin = %request.plugin(), command = %invocation, "Executing plugin");

    let result = collaborators
        .executor
        .execute(
            request.plugin(),
            &invocation,
            inner.settings.background_timeout,
        )
        .await;

    if result.succeeded {
        info!("{}", report::format_success(request.plugin(), request.raw_text()));
        collaborators
            .metrics
            .record_outcome(DispatchOutcomeKind::AsyncSucceeded);
        return AsyncCompletion::Succeeded;
    }

    let output = result.output_lossy();
    error!(
        plugin = %request.plugin(),
        reason = %result.failure_detail.as_deref().unwrap_or_default(),
        output = %output,
        "Failure executing plugin"
    );
    collaborators
        .metrics
        .record_outcome(DispatchOutcomeKind::AsyncFailed);

    let notified = match request.response_callback() {
        Some(url) => match collaborators
            .notifier
            .notify_failure(url, &result.failure_report())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Could not deliver failure notification");
                false
            }
        },
        None => {
            warn!(
                plugin = %request.plugin(),
                "No response callback supplied, failure not reported to requester"
            );
            false
        }
    };

    AsyncCompletion::Failed { notified }
}

//! Plugin process execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::DispatchError;

use super::types::{ExecutionResult, PluginInvocation};

/// Runs a resolved invocation to completion.
///
/// Implementations never return an error: every way a run can fail is
/// folded into an unsuccessful `ExecutionResult`.
#[async_trait]
pub trait PluginExecutor: Send + Sync {
    async fn execute(
        &self,
        plugin: &str,
        invocation: &PluginInvocation,
        deadline: Duration,
    ) -> ExecutionResult;
}

/// Spawns the plugin as a child process with an explicit argv.
///
/// stdin is closed, stdout and stderr are captured, and the child is killed
/// if `deadline` expires before it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginExecutor for ProcessExecutor {
    async fn execute(
        &self,
        plugin: &str,
        invocation: &PluginInvocation,
        deadline: Duration,
    ) -> ExecutionResult {
        let started = Instant::now();

        let child = Command::new(&invocation.executable)
            .args(&invocation.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let err = DispatchError::Execution(format!(
                    "failed to start '{}': {}",
                    invocation.executable, e
                ));
                return ExecutionResult::failure(Vec::new(), err.to_string());
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let err = DispatchError::Execution(format!("failed waiting for plugin: {}", e));
                return ExecutionResult::failure(Vec::new(), err.to_string());
            }
            Err(_) => {
                let err = DispatchError::Timeout {
                    plugin: plugin.to_string(),
                    secs: deadline.as_secs(),
                };
                return ExecutionResult::failure(Vec::new(), err.to_string());
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        debug!(
            plugin = %plugin,
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_bytes = combined.len(),
            "Plugin process exited"
        );

        if output.status.success() {
            ExecutionResult::success(combined)
        } else {
            let err = DispatchError::Execution(format!("plugin exited with {}", output.status));
            ExecutionResult::failure(combined, err.to_string())
        }
    }
}

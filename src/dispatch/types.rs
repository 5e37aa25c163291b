//! Request-scoped data flowing through the dispatch pipeline.

use std::collections::BTreeMap;

use tokio::task::JoinHandle;
use uuid::Uuid;

/// Request keys that route the request instead of being passed to the plugin.
pub const PLUGIN_KEY: &str = "plugin";
pub const LOADER_KEY: &str = "loader";

/// Keys (current name first, then legacy alias) selecting job-runner mode.
pub const JOB_RUNNER_CALLBACK_KEYS: &[&str] = &["jobRunnerCallback", "jobRunnerUrl"];
/// Keys (current name first, then legacy alias) carrying the failure webhook.
pub const RESPONSE_CALLBACK_KEYS: &[&str] = &["responseCallback", "response_url"];
pub const USER_NAME_KEY: &str = "user_name";
pub const TEXT_KEY: &str = "text";

/// One inbound invocation request.
///
/// Built once per HTTP request and never mutated afterwards. `parameters`
/// never contains the `plugin` or `loader` keys; every other key the caller
/// sent is kept and forwarded to the plugin.
///
/// ```rust
/// use chatops_dispatch::dispatch::DispatchRequest;
///
/// let request = DispatchRequest::from_pairs([
///     ("plugin", "deploy.sh"),
///     ("loader", "python"),
///     ("env", "staging"),
///     ("env", "ignored-duplicate"),
/// ]);
/// assert_eq!(request.plugin(), "deploy.sh");
/// assert_eq!(request.parameters().len(), 1);
/// assert_eq!(request.parameters()["env"], "staging");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    id: Uuid,
    loader: String,
    plugin: String,
    parameters: BTreeMap<String, String>,
}

impl DispatchRequest {
    /// Create a request with no plugin parameters.
    pub fn new(loader: &str, plugin: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            loader: loader.to_string(),
            plugin: plugin.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    /// Build from decoded key/value pairs in the order they were received.
    ///
    /// For repeated keys the first value wins. Missing `plugin`/`loader`
    /// become empty strings, which the engine rejects.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut loader: Option<String> = None;
        let mut plugin: Option<String> = None;
        let mut parameters = BTreeMap::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                PLUGIN_KEY => {
                    plugin.get_or_insert_with(|| value.to_string());
                }
                LOADER_KEY => {
                    loader.get_or_insert_with(|| value.to_string());
                }
                _ => {
                    parameters
                        .entry(key.to_string())
                        .or_insert_with(|| value.to_string());
                }
            }
        }

        Self {
            id: Uuid::new_v4(),
            loader: loader.unwrap_or_default(),
            plugin: plugin.unwrap_or_default(),
            parameters,
        }
    }

    /// Add a plugin parameter. Routing keys and repeated keys are ignored.
    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        if key != PLUGIN_KEY && key != LOADER_KEY {
            self.parameters
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
        self
    }

    /// Per-request identifier used in log spans.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn loader(&self) -> &str {
        &self.loader
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Parameters forwarded to the plugin, keyed and sorted by name.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    fn first_non_empty(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.parameters.get(*key))
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
    }

    /// Job-runner callback. Present (and non-empty) means synchronous mode.
    pub fn job_runner_callback(&self) -> Option<&str> {
        self.first_non_empty(JOB_RUNNER_CALLBACK_KEYS)
    }

    /// Webhook notified when a detached execution fails.
    pub fn response_callback(&self) -> Option<&str> {
        self.first_non_empty(RESPONSE_CALLBACK_KEYS)
    }

    pub fn requesting_user(&self) -> Option<&str> {
        self.parameters.get(USER_NAME_KEY).map(String::as_str)
    }

    /// Free-form text the chat user typed after the command.
    pub fn raw_text(&self) -> Option<&str> {
        self.parameters.get(TEXT_KEY).map(String::as_str)
    }

    /// Whether the caller blocks for the plugin's output.
    pub fn is_synchronous(&self) -> bool {
        self.job_runner_callback().is_some()
    }
}

/// Fully resolved process invocation: an explicit argv, never a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInvocation {
    pub executable: String,
    pub arguments: Vec<String>,
}

impl std::fmt::Display for PluginInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.arguments {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'') {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Outcome of running a `PluginInvocation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// stdout followed by stderr.
    pub combined_output: Vec<u8>,
    pub succeeded: bool,
    /// Why the run failed (exit status, spawn error, deadline).
    pub failure_detail: Option<String>,
}

impl ExecutionResult {
    pub fn success(combined_output: Vec<u8>) -> Self {
        Self {
            combined_output,
            succeeded: true,
            failure_detail: None,
        }
    }

    pub fn failure(combined_output: Vec<u8>, detail: impl Into<String>) -> Self {
        Self {
            combined_output,
            succeeded: false,
            failure_detail: Some(detail.into()),
        }
    }

    /// Output decoded as UTF-8, invalid sequences replaced.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.combined_output).into_owned()
    }

    /// Text sent to the requester for a failed run: the captured output, or
    /// the failure detail when the plugin produced nothing (e.g. a timeout).
    pub fn failure_report(&self) -> String {
        if self.combined_output.iter().all(u8::is_ascii_whitespace) {
            if let Some(detail) = &self.failure_detail {
                return detail.clone();
            }
        }
        self.output_lossy()
    }
}

/// How a detached execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncCompletion {
    Succeeded,
    Failed {
        /// Whether the failure webhook was delivered.
        notified: bool,
    },
}

/// What the engine hands back to the transport for a single request.
///
/// Exactly one of these maps to exactly one response write.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Bad request; nothing was audited, counted or spawned.
    Rejected { message: String },
    /// The audit record could not be written; the plugin was not run.
    AuditFailed { message: String },
    /// Job-runner mode: the plugin ran to completion inside the request.
    Sync {
        plugin: String,
        result: ExecutionResult,
    },
    /// Interactive mode: acknowledgment for the caller plus the detached
    /// task's handle. The transport drops the handle without awaiting it.
    Accepted {
        acknowledgment: String,
        completion: JoinHandle<AsyncCompletion>,
    },
}

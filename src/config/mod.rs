//! Configuration for the dispatcher
//!
//! Configuration is read from `~/.chatops-dispatch/config.json` (or an
//! explicit path), every section falls back to defaults when absent, and a
//! small set of `CHATOPS_DISPATCH_*` environment variables override the file.
//!
//! ```json
//! {
//!   "server": { "bind": "0.0.0.0:4443" },
//!   "dispatch": {
//!     "plugin_root": "/opt/slack-plugins",
//!     "sync_timeout_secs": 300,
//!     "background_timeout_secs": 3600
//!   },
//!   "audit": { "log_path": "plugin-execution.log" },
//!   "metrics": { "statsd_address": "stats-d:8125", "prefix": "slack-plugin-api." },
//!   "notify": { "timeout_secs": 10 },
//!   "logging": { "format": "json" },
//!   "loaders": [ { "id": "bash", "command": "bash", "style": "python" } ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DispatchError, Result};
use crate::loaders::{ArgumentStyle, BUILTIN_LOADERS};

/// Prefix for all environment overrides.
pub const ENV_PREFIX: &str = "CHATOPS_DISPATCH_";

/// Root configuration object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub audit: AuditConfig,
    pub metrics: MetricsConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
    /// Loaders registered in addition to the built-in table.
    pub loaders: Vec<LoaderConfig>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:4443".to_string(),
        }
    }
}

/// Plugin location and execution deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Plugins live at `{plugin_root}/{loader}/{plugin}`.
    pub plugin_root: PathBuf,
    /// Deadline for job-runner (synchronous) executions.
    pub sync_timeout_secs: u64,
    /// Deadline for detached (interactive) executions.
    pub background_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            plugin_root: PathBuf::from("/opt/slack-plugins"),
            sync_timeout_secs: 300,
            background_timeout_secs: 3600,
        }
    }
}

/// Execution audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Append-only file receiving one line per accepted request.
    pub log_path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("plugin-execution.log"),
        }
    }
}

/// Usage counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// `host:port` of a StatsD daemon. `None` keeps counters in-process only.
    pub statsd_address: Option<String>,
    /// Prefix prepended to every StatsD metric name.
    pub prefix: String,
    /// Serve counters at `GET /metrics`.
    pub expose_endpoint: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            statsd_address: None,
            prefix: "slack-plugin-api.".to_string(),
            expose_endpoint: true,
        }
    }
}

/// Outbound failure webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Request timeout for the webhook POST.
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(DispatchError::Config(format!(
                "Unknown log format '{}': expected 'text' or 'json'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// A loader declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Loader id accepted in requests.
    pub id: String,
    /// Command line used to run plugins, e.g. `"bash"` or `"deno run"`.
    pub command: String,
    /// Argument convention for plugins run by this loader.
    pub style: ArgumentStyle,
}

impl Config {
    /// Configuration directory (`~/.chatops-dispatch`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chatops-dispatch")
    }

    /// Default configuration file path.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from `path` (defaults if the file does not exist), apply
    /// environment overrides and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                DispatchError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let config: Config = serde_json::from_str(&content)?;
            info!(path = %path.display(), "Loaded configuration");
            config
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CHATOPS_DISPATCH_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(bind) = var("BIND") {
            self.server.bind = bind;
        }
        if let Some(root) = var("PLUGIN_ROOT") {
            self.dispatch.plugin_root = PathBuf::from(root);
        }
        if let Some(secs) = var("SYNC_TIMEOUT_SECS") {
            self.dispatch.sync_timeout_secs = parse_secs("SYNC_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = var("BACKGROUND_TIMEOUT_SECS") {
            self.dispatch.background_timeout_secs = parse_secs("BACKGROUND_TIMEOUT_SECS", &secs)?;
        }
        if let Some(path) = var("AUDIT_LOG") {
            self.audit.log_path = PathBuf::from(path);
        }
        if let Some(addr) = var("STATSD_ADDRESS") {
            self.metrics.statsd_address = Some(addr);
        }
        if let Some(prefix) = var("METRICS_PREFIX") {
            self.metrics.prefix = prefix;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Reject configurations the dispatcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.plugin_root.as_os_str().is_empty() {
            return Err(DispatchError::Config(
                "dispatch.plugin_root cannot be empty".to_string(),
            ));
        }
        if self.dispatch.sync_timeout_secs == 0 || self.dispatch.background_timeout_secs == 0 {
            return Err(DispatchError::Config(
                "dispatch timeouts must be greater than zero".to_string(),
            ));
        }
        if self.notify.timeout_secs == 0 {
            return Err(DispatchError::Config(
                "notify.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.audit.log_path.as_os_str().is_empty() {
            return Err(DispatchError::Config(
                "audit.log_path cannot be empty".to_string(),
            ));
        }

        for (idx, loader) in self.loaders.iter().enumerate() {
            if loader.id.trim().is_empty() || loader.command.trim().is_empty() {
                return Err(DispatchError::Config(format!(
                    "loaders[{}] needs a non-empty id and command",
                    idx
                )));
            }
            if BUILTIN_LOADERS.iter().any(|b| b.id == loader.id) {
                return Err(DispatchError::Config(format!(
                    "loaders[{}] redefines built-in loader '{}'",
                    idx, loader.id
                )));
            }
            if self.loaders[..idx].iter().any(|l| l.id == loader.id) {
                return Err(DispatchError::Config(format!(
                    "loader '{}' is declared more than once",
                    loader.id
                )));
            }
        }
        Ok(())
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|e| {
        DispatchError::Config(format!("{}{} must be an integer: {}", ENV_PREFIX, name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:4443");
        assert_eq!(config.dispatch.plugin_root, PathBuf::from("/opt/slack-plugins"));
        assert_eq!(config.dispatch.sync_timeout_secs, 300);
        assert_eq!(config.audit.log_path, PathBuf::from("plugin-execution.log"));
        assert_eq!(config.metrics.prefix, "slack-plugin-api.");
        assert!(config.metrics.statsd_address.is_none());
        assert!(config.loaders.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"dispatch": {"plugin_root": "/srv/plugins"}}"#).unwrap();
        assert_eq!(config.dispatch.plugin_root, PathBuf::from("/srv/plugins"));
        assert_eq!(config.dispatch.sync_timeout_secs, 300);
        assert_eq!(config.server.bind, "0.0.0.0:4443");
    }

    #[test]
    fn test_load_from_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(config.notify.timeout_secs, 10);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "server": {"bind": "127.0.0.1:9000"},
                "loaders": [{"id": "bash", "command": "bash", "style": "python"}]
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.loaders.len(), 1);
        assert_eq!(config.loaders[0].style, ArgumentStyle::Python);
    }

    #[test]
    fn test_load_from_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(DispatchError::Json(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env(&[
                ("CHATOPS_DISPATCH_BIND", "127.0.0.1:8080"),
                ("CHATOPS_DISPATCH_PLUGIN_ROOT", "/tmp/plugins"),
                ("CHATOPS_DISPATCH_SYNC_TIMEOUT_SECS", "15"),
                ("CHATOPS_DISPATCH_STATSD_ADDRESS", "127.0.0.1:8125"),
                ("CHATOPS_DISPATCH_LOG_FORMAT", "json"),
            ]))
            .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.dispatch.plugin_root, PathBuf::from("/tmp/plugins"));
        assert_eq!(config.dispatch.sync_timeout_secs, 15);
        assert_eq!(
            config.metrics.statsd_address.as_deref(),
            Some("127.0.0.1:8125")
        );
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_override_blank_is_ignored() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env(&[("CHATOPS_DISPATCH_BIND", "  ")]))
            .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:4443");
    }

    #[test]
    fn test_env_override_bad_number() {
        let mut config = Config::default();
        let result =
            config.apply_env_overrides(env(&[("CHATOPS_DISPATCH_SYNC_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.dispatch.sync_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_loader_shadowing_builtin() {
        let mut config = Config::default();
        config.loaders.push(LoaderConfig {
            id: "go".to_string(),
            command: "go run".to_string(),
            style: ArgumentStyle::Go,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("built-in loader 'go'"));
    }

    #[test]
    fn test_validate_duplicate_loader() {
        let mut config = Config::default();
        let bash = LoaderConfig {
            id: "bash".to_string(),
            command: "bash".to_string(),
            style: ArgumentStyle::Python,
        };
        config.loaders.push(bash.clone());
        config.loaders.push(bash);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

//! Command building, plugin-name validation and metric naming.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DispatchError, Result};
use crate::loaders::LoaderDescriptor;

use super::types::PluginInvocation;

static PLUGIN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]{0,127}$").expect("valid regex"));

static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\w+").expect("valid regex"));

/// Check that `plugin` is a bare file name inside its loader directory.
///
/// # Errors
/// - `DispatchError::InvalidRequest` if the name is empty
/// - `DispatchError::SecurityViolation` if it contains a path separator, a
///   parent-directory sequence, or characters outside `[A-Za-z0-9_.-]`
pub fn validate_plugin_name(plugin: &str) -> Result<()> {
    if plugin.is_empty() {
        return Err(DispatchError::InvalidRequest(
            "plugin name is empty".to_string(),
        ));
    }
    if plugin.contains("..") || plugin.contains('/') || plugin.contains('\\') {
        return Err(DispatchError::SecurityViolation(format!(
            "plugin name '{}' contains a path traversal sequence",
            plugin
        )));
    }
    if !PLUGIN_NAME_RE.is_match(plugin) {
        return Err(DispatchError::SecurityViolation(format!(
            "plugin name '{}' must be 1-128 characters of [A-Za-z0-9_.-]",
            plugin
        )));
    }
    Ok(())
}

/// `{plugin_root}/{loader_id}/{plugin}`. Existence is not checked.
pub fn plugin_path(plugin_root: &Path, loader_id: &str, plugin: &str) -> PathBuf {
    plugin_root.join(loader_id).join(plugin)
}

/// Assemble the final argv: loader tokens, then the plugin path, then the
/// translated plugin arguments.
pub fn build(
    descriptor: &LoaderDescriptor,
    plugin_path: &Path,
    translated_args: Vec<String>,
) -> PluginInvocation {
    let mut arguments =
        Vec::with_capacity(descriptor.leading_args().len() + 1 + translated_args.len());
    arguments.extend(descriptor.leading_args().iter().cloned());
    arguments.push(plugin_path.to_string_lossy().into_owned());
    arguments.extend(translated_args);

    PluginInvocation {
        executable: descriptor.executable().to_string(),
        arguments,
    }
}

/// Usage counter name for a plugin: every `.ext` segment removed.
///
/// `deploy.sh` → `deploy`, `run` → `run`.
pub fn metric_name(plugin: &str) -> String {
    EXTENSION_RE.replace_all(plugin, "").into_owned()
}

//! Loader types
//!
//! A loader is the runtime a plugin is executed with (an interpreter, or a
//! toolchain subcommand such as `go run`). The loader also decides how
//! request parameters are spelled on the plugin's command line.

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Command-line convention a loader's plugins expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentStyle {
    /// argparse-style: `-key value` as two separate argv entries.
    Python,
    /// Go `flag`-style: a single `--key=value` argv entry.
    Go,
}

impl std::fmt::Display for ArgumentStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentStyle::Python => write!(f, "python"),
            ArgumentStyle::Go => write!(f, "go"),
        }
    }
}

/// Immutable description of one registered loader.
///
/// `invocation_tokens` always holds at least one entry. The first token is
/// the executable that gets spawned; the remaining tokens are passed to it
/// ahead of the plugin path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderDescriptor {
    id: String,
    invocation_tokens: Vec<String>,
    argument_style: ArgumentStyle,
}

impl LoaderDescriptor {
    /// Create a descriptor from a whitespace-separated command line such as
    /// `"python3"` or `"go run"`.
    ///
    /// # Errors
    /// `DispatchError::Config` when the id or the command is blank.
    pub fn new(id: &str, command: &str, argument_style: ArgumentStyle) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DispatchError::Config("Loader id cannot be empty".to_string()));
        }

        let invocation_tokens: Vec<String> =
            command.split_whitespace().map(str::to_string).collect();
        if invocation_tokens.is_empty() {
            return Err(DispatchError::Config(format!(
                "Loader '{}' has an empty command",
                id
            )));
        }

        Ok(Self {
            id: id.to_string(),
            invocation_tokens,
            argument_style,
        })
    }

    /// Loader identifier as it appears in requests (e.g. `"go"`).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full invocation, executable first.
    pub fn invocation_tokens(&self) -> &[String] {
        &self.invocation_tokens
    }

    /// The program that is actually spawned.
    pub fn executable(&self) -> &str {
        &self.invocation_tokens[0]
    }

    /// Tokens placed before the plugin path (e.g. `["run"]` for `go run`).
    pub fn leading_args(&self) -> &[String] {
        &self.invocation_tokens[1..]
    }

    pub fn argument_style(&self) -> ArgumentStyle {
        self.argument_style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token_command() {
        let loader = LoaderDescriptor::new("python", "python", ArgumentStyle::Python).unwrap();
        assert_eq!(loader.id(), "python");
        assert_eq!(loader.executable(), "python");
        assert!(loader.leading_args().is_empty());
    }

    #[test]
    fn test_multi_token_command() {
        let loader = LoaderDescriptor::new("go", "go  run", ArgumentStyle::Go).unwrap();
        assert_eq!(loader.executable(), "go");
        assert_eq!(loader.leading_args(), &["run".to_string()]);
        assert_eq!(loader.invocation_tokens().len(), 2);
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = LoaderDescriptor::new("blank", "   ", ArgumentStyle::Python);
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(LoaderDescriptor::new(" ", "sh", ArgumentStyle::Python).is_err());
    }

    #[test]
    fn test_argument_style_serde() {
        let style: ArgumentStyle = serde_json::from_str("\"go\"").unwrap();
        assert_eq!(style, ArgumentStyle::Go);
        assert_eq!(
            serde_json::to_string(&ArgumentStyle::Python).unwrap(),
            "\"python\""
        );
    }
}

//! Loader registry
//!
//! Fixed lookup table from loader id to `LoaderDescriptor`. The table is
//! assembled once at startup from the built-in loaders plus any extra
//! loaders declared in configuration, and is read-only afterwards.

use std::collections::HashMap;

use tracing::info;

use crate::config::LoaderConfig;
use crate::error::{DispatchError, Result};

use super::types::{ArgumentStyle, LoaderDescriptor};

/// Static metadata for a built-in loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinLoader {
    /// Loader id accepted in requests.
    pub id: &'static str,
    /// Command line used to run a plugin (split on whitespace).
    pub command: &'static str,
    /// Argument convention for plugins run by this loader.
    pub style: ArgumentStyle,
}

/// Loaders available without any configuration.
pub const BUILTIN_LOADERS: &[BuiltinLoader] = &[
    BuiltinLoader {
        id: "python",
        command: "python",
        style: ArgumentStyle::Python,
    },
    BuiltinLoader {
        id: "python3",
        command: "python3",
        style: ArgumentStyle::Python,
    },
    BuiltinLoader {
        id: "node",
        command: "node",
        style: ArgumentStyle::Python,
    },
    BuiltinLoader {
        id: "go",
        command: "go run",
        style: ArgumentStyle::Go,
    },
];

/// Read-only map of the loaders this process accepts.
///
/// # Example
///
/// ```rust
/// use chatops_dispatch::loaders::{ArgumentStyle, LoaderRegistry};
///
/// let registry = LoaderRegistry::builtin();
/// let go = registry.resolve("go").unwrap();
/// assert_eq!(go.executable(), "go");
/// assert_eq!(go.argument_style(), ArgumentStyle::Go);
/// assert!(registry.resolve("ruby").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<String, LoaderDescriptor>,
}

impl LoaderRegistry {
    /// Registry holding only `BUILTIN_LOADERS`.
    pub fn builtin() -> Self {
        let loaders = BUILTIN_LOADERS
            .iter()
            .filter_map(|spec| {
                LoaderDescriptor::new(spec.id, spec.command, spec.style)
                    .ok()
                    .map(|descriptor| (spec.id.to_string(), descriptor))
            })
            .collect();
        Self { loaders }
    }

    /// Registry holding exactly the given descriptors. Used by tests and by
    /// embedders that do not want the built-in table.
    ///
    /// # Errors
    /// `DispatchError::Config` when two descriptors share an id.
    pub fn from_descriptors(descriptors: Vec<LoaderDescriptor>) -> Result<Self> {
        let mut registry = Self {
            loaders: HashMap::new(),
        };
        for descriptor in descriptors {
            registry.insert_new(descriptor)?;
        }
        Ok(registry)
    }

    /// Built-in loaders extended with the loaders declared in config.
    ///
    /// Extra loaders may not shadow a built-in or each other.
    pub fn from_config(extra: &[LoaderConfig]) -> Result<Self> {
        let mut registry = Self::builtin();
        for entry in extra {
            let descriptor = LoaderDescriptor::new(&entry.id, &entry.command, entry.style)?;
            registry.insert_new(descriptor)?;
            info!(
                loader = %entry.id,
                command = %entry.command,
                style = %entry.style,
                "Registered configured loader"
            );
        }
        Ok(registry)
    }

    fn insert_new(&mut self, descriptor: LoaderDescriptor) -> Result<()> {
        if self.loaders.contains_key(descriptor.id()) {
            return Err(DispatchError::Config(format!(
                "Loader '{}' is already registered",
                descriptor.id()
            )));
        }
        self.loaders.insert(descriptor.id().to_string(), descriptor);
        Ok(())
    }

    /// Look up a loader by its exact (case-sensitive) id.
    pub fn resolve(&self, loader_id: &str) -> Option<&LoaderDescriptor> {
        self.loaders.get(loader_id)
    }

    /// Registered loader ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Registered descriptors, sorted by id.
    pub fn descriptors(&self) -> Vec<&LoaderDescriptor> {
        let mut descriptors: Vec<&LoaderDescriptor> = self.loaders.values().collect();
        descriptors.sort_by(|a, b| a.id().cmp(b.id()));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loaders_resolve() {
        let registry = LoaderRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_LOADERS.len());
        assert_eq!(registry.ids(), vec!["go", "node", "python", "python3"]);

        let python = registry.resolve("python").unwrap();
        assert_eq!(python.invocation_tokens(), &["python".to_string()]);
        assert_eq!(python.argument_style(), ArgumentStyle::Python);

        let go = registry.resolve("go").unwrap();
        assert_eq!(go.invocation_tokens(), &["go".to_string(), "run".to_string()]);
        assert_eq!(go.argument_style(), ArgumentStyle::Go);
    }

    #[test]
    fn test_unknown_loader_not_found() {
        let registry = LoaderRegistry::builtin();
        assert!(registry.resolve("ruby").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let registry = LoaderRegistry::builtin();
        assert!(registry.resolve("Python").is_none());
    }

    #[test]
    fn test_from_config_adds_loader() {
        let extra = vec![LoaderConfig {
            id: "bash".to_string(),
            command: "bash".to_string(),
            style: ArgumentStyle::Python,
        }];
        let registry = LoaderRegistry::from_config(&extra).unwrap();
        assert_eq!(registry.len(), BUILTIN_LOADERS.len() + 1);
        assert_eq!(registry.resolve("bash").unwrap().executable(), "bash");
    }

    #[test]
    fn test_from_config_rejects_shadowing_builtin() {
        let extra = vec![LoaderConfig {
            id: "python".to_string(),
            command: "/usr/local/bin/python".to_string(),
            style: ArgumentStyle::Python,
        }];
        let result = LoaderRegistry::from_config(&extra);
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn test_from_descriptors_rejects_duplicates() {
        let sh = LoaderDescriptor::new("sh", "sh", ArgumentStyle::Python).unwrap();
        let result = LoaderRegistry::from_descriptors(vec![sh.clone(), sh]);
        assert!(result.is_err());
    }

    #[test]
    fn test_descriptors_sorted() {
        let registry = LoaderRegistry::builtin();
        let ids: Vec<&str> = registry.descriptors().iter().map(|d| d.id()).collect();
        assert_eq!(ids, registry.ids());
    }
}

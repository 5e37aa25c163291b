//! Command dispatch
//!
//! Turns a validated chat request into a plugin process:
//!
//! 1. [`command::validate_plugin_name`] and loader lookup reject bad input.
//! 2. [`args::translate`] renders parameters in the loader's argument style.
//! 3. [`command::build`] assembles the argv.
//! 4. [`engine::DispatchEngine`] audits, meters and runs it, inline or detached.

pub mod args;
pub mod command;
pub mod engine;
pub mod executor;
pub mod types;

pub use args::translate;
pub use command::{build, metric_name, plugin_path, validate_plugin_name};
pub use engine::{Collaborators, DispatchEngine, EngineSettings};
pub use executor::{PluginExecutor, ProcessExecutor};
pub use types::{
    AsyncCompletion, DispatchOutcome, DispatchRequest, ExecutionResult, PluginInvocation,
};

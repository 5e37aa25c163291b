//! ChatOps Dispatch - run loader-specific plugins from chat slash commands

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod loaders;
pub mod metrics;
pub mod notify;
pub mod report;

pub use config::Config;
pub use dispatch::{DispatchEngine, DispatchOutcome, DispatchRequest};
pub use error::{DispatchError, Result};

//! Loader registry
//!
//! Maps the `loader` request parameter to the runtime that executes a plugin
//! and to the argument convention that runtime's plugins parse.
//!
//! | id        | command   | style  |
//! |-----------|-----------|--------|
//! | `python`  | `python`  | python |
//! | `python3` | `python3` | python |
//! | `node`    | `node`    | python |
//! | `go`      | `go run`  | go     |
//!
//! Additional loaders can be declared under `loaders` in `config.json`.

pub mod registry;
pub mod types;

pub use registry::{BuiltinLoader, LoaderRegistry, BUILTIN_LOADERS};
pub use types::{ArgumentStyle, LoaderDescriptor};

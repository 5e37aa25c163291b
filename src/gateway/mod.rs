//! Inbound HTTP gateway.

pub mod request;
pub mod server;

pub use request::parse_request;
pub use server::{router, serve, AppState};

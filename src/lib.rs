//! badserv: a misbehaving HTTP server for exercising client failure handling.
//!
//! Clients pick a fault with the `action` query parameter:
//! `hang`, `close`, `slow-write`, or none for a normal response.

pub mod actions;
pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::BadservConfig;
pub use context::ExecContext;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (hijackable transport)
//!     → server.rs (hyper HTTP/1, context + hijacker injection)
//!     → request.rs (request ID, body read, diagnostic dump)
//!     → actions engine (fault dispatch)
//!     → response.rs (document serving, error bodies)
//!     → Send to client, unless the connection was hijacked
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{BufferedRequest, RequestId};
pub use server::{AppState, HttpServer};

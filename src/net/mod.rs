//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (connection ID, live connection count)
//!     → hijack.rs (shared transport, exclusive raw access)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so handler cleanup is observable
//! - Raw access is a capability object taken at most once

pub mod connection;
pub mod hijack;
pub mod listener;

pub use connection::{ConnectionId, ConnectionTracker, IdSequence};
pub use hijack::{HijackError, HijackableStream, HijackedConnection, Hijacker};
pub use listener::{Listener, ListenerError};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Connection task → connection span {conn_id}
//! Action engine   → request span {conn_id, request_id}
//!     → logging.rs subscriber (text or JSON on stderr)
//! ```
//!
//! # Design Decisions
//! - Identifiers live in the explicit ExecContext; spans only render them
//! - Callers never repeat conn_id/request_id on individual events

pub mod logging;

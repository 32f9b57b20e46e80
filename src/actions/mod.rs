//! Fault action engine.
//!
//! # Data Flow
//! ```text
//! Request (with ExecContext + Hijacker extensions)
//!     → engine.rs (tag request ID, read body, parse `action`)
//!     → ""          → fixed document via content serving
//!     → hang        → wait for context cancellation, write nothing
//!     → close       → hijack, close socket, zero bytes
//!     → slow-write  → hijack, slow_write.rs emits 1 byte / interval
//!     → other       → 400 unknown action
//! ```

pub mod engine;
pub mod slow_write;

pub use engine::handle;

/// Name the fixed document is served under.
pub const DOCUMENT_NAME: &str = "limerick.txt";

/// The fixed text document served by the default action and `slow-write`.
pub const DOCUMENT: &str = "In the realm of requests and replies,
HTTP with its status denies.
With a 404 frown,
It turns users to clowns,
As they search for the page that belies.
";

/// Behavior selected by the `action` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action requested: serve the document normally.
    Default,
    /// Never answer; wait for the client to go away.
    Hang,
    /// Drop the connection without a response.
    Close,
    /// Hand-written response trickled out byte by byte.
    SlowWrite,
    /// Anything else.
    Unknown(String),
}

impl Action {
    pub fn parse(name: &str) -> Self {
        match name {
            "" => Action::Default,
            "hang" => Action::Hang,
            "close" => Action::Close,
            "slow-write" => Action::SlowWrite,
            other => Action::Unknown(other.to_string()),
        }
    }

    /// Wire name of the action.
    pub fn as_str(&self) -> &str {
        match self {
            Action::Default => "",
            Action::Hang => "hang",
            Action::Close => "close",
            Action::SlowWrite => "slow-write",
            Action::Unknown(name) => name,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Connection identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique, monotonic connection IDs for log correlation
//! - Provide the lock-free ID sequence shared with request tagging
//! - Count live connections so callers can observe handler cleanup

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic, process-wide ID generator.
///
/// Relaxed ordering is sufficient: `fetch_add` alone guarantees every caller
/// sees a distinct value, and nothing else is synchronized through it.
#[derive(Debug)]
pub struct IdSequence<T> {
    next: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: From<u64>> IdSequence<T> {
    /// Create a sequence whose first ID is 1.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            _marker: PhantomData,
        }
    }

    /// Take the next ID.
    pub fn next_id(&self) -> T {
        T::from(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl<T: From<u64>> Default for IdSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an accepted transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks live connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, id: ConnectionId) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every tracked connection has closed.
    pub async fn wait_for_idle(&self) {
        while self.active_count.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(conn_id = %self.id, "Connection closed");
    }
}

//! Execution context: per-connection and per-request state threaded through
//! request handling.
//!
//! A connection task creates the root context with [`ExecContext::for_connection`]
//! and keeps the paired [`CancelHandle`]. Each request derives its own context
//! with [`ExecContext::with_request_id`]. Contexts are immutable; derivation
//! returns a new value that shares the cancellation signal.

use tokio::sync::watch;

use crate::http::RequestId;
use crate::net::ConnectionId;

/// Context for a single connection or request.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    conn_id: Option<ConnectionId>,
    request_id: Option<RequestId>,
    /// `None` for detached contexts, which are never cancelled.
    cancel: Option<watch::Receiver<bool>>,
}

impl ExecContext {
    /// A context with no identifiers that is never cancelled.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Root context for an accepted connection.
    pub fn for_connection(conn_id: ConnectionId) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            conn_id: Some(conn_id),
            request_id: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Derive a context carrying `request_id`.
    pub fn with_request_id(&self, request_id: RequestId) -> Self {
        Self {
            request_id: Some(request_id),
            ..self.clone()
        }
    }

    pub fn conn_id(&self) -> Option<ConnectionId> {
        self.conn_id
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    /// Whether the connection behind this context has gone away.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once the context is cancelled.
    ///
    /// A dropped [`CancelHandle`] counts as cancellation.
    pub async fn cancelled(&self) {
        match &self.cancel {
            Some(rx) => {
                let mut rx = rx.clone();
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            }
            None => std::future::pending().await,
        }
    }
}

/// Owning side of a context's cancellation signal.
///
/// Cancels on drop, so a connection task that ends for any reason releases
/// every waiter.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

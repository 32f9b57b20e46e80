//! Exclusive raw access to a served connection.
//!
//! # Responsibilities
//! - Wrap each accepted `TcpStream` so hyper drives it through a shared slot
//! - Hand the raw stream to exactly one taker (`Hijacker::hijack`)
//! - Refuse further HTTP-layer I/O once the stream has been taken
//!
//! # Data Flow
//! ```text
//! TcpStream ─→ HijackableStream ─→ hyper http1 dispatcher
//!                    │
//!                    └── Hijacker (request extension)
//!                            │ hijack()
//!                            ▼
//!                     HijackedConnection (owned by the handler)
//! ```
//!
//! After a hijack the wrapper parks reads (`Pending`) and reports flushes as
//! complete so the dispatcher keeps polling the in-flight handler. Writes fail,
//! so any response the handler returns is discarded instead of reaching the
//! socket.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

/// Error returned when exclusive access cannot be granted.
#[derive(Debug, thiserror::Error)]
pub enum HijackError {
    /// The request was not served over a hijackable transport.
    #[error("connection does not support hijacking")]
    Unsupported,
    /// Someone already took the connection.
    #[error("connection already hijacked")]
    AlreadyHijacked,
}

type Slot = Arc<Mutex<Option<TcpStream>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<TcpStream>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport handed to hyper. Delegates to the stream until it is hijacked.
#[derive(Debug)]
pub struct HijackableStream {
    slot: Slot,
}

impl HijackableStream {
    /// Wrap a stream, returning the transport and its hijack capability.
    pub fn new(stream: TcpStream) -> (Self, Hijacker) {
        let peer_addr = stream.peer_addr().ok();
        let slot = Arc::new(Mutex::new(Some(stream)));
        let hijacker = Hijacker {
            slot: Arc::clone(&slot),
            peer_addr,
        };
        (Self { slot }, hijacker)
    }
}

fn hijacked() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection hijacked")
}

impl AsyncRead for HijackableStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match lock(&self.slot).as_mut() {
            Some(stream) => Pin::new(stream).poll_read(cx, buf),
            // The handler owns the socket now; the dispatcher is woken by the
            // handler's own progress, never by this read.
            None => Poll::Pending,
        }
    }
}

impl AsyncWrite for HijackableStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match lock(&self.slot).as_mut() {
            Some(stream) => Pin::new(stream).poll_write(cx, buf),
            None => Poll::Ready(Err(hijacked())),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match lock(&self.slot).as_mut() {
            Some(stream) => Pin::new(stream).poll_write_vectored(cx, bufs),
            None => Poll::Ready(Err(hijacked())),
        }
    }

    fn is_write_vectored(&self) -> bool {
        true
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match lock(&self.slot).as_mut() {
            Some(stream) => Pin::new(stream).poll_flush(cx),
            // Nothing buffered here; the dispatcher flushes between polls of
            // the handler and must not see an error for it.
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match lock(&self.slot).as_mut() {
            Some(stream) => Pin::new(stream).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Capability to take a connection away from the HTTP layer.
///
/// Inserted into every request's extensions by the connection task.
#[derive(Debug, Clone)]
pub struct Hijacker {
    slot: Slot,
    peer_addr: Option<SocketAddr>,
}

impl Hijacker {
    /// Take exclusive ownership of the raw connection. Succeeds at most once.
    pub fn hijack(&self) -> Result<HijackedConnection, HijackError> {
        let stream = lock(&self.slot).take().ok_or(HijackError::AlreadyHijacked)?;
        tracing::debug!(peer_addr = ?self.peer_addr, "Connection hijacked");
        Ok(HijackedConnection { stream })
    }

    /// Whether the raw connection has been taken.
    pub fn is_hijacked(&self) -> bool {
        lock(&self.slot).is_none()
    }
}

/// A raw connection owned outside of the HTTP machinery.
#[derive(Debug)]
pub struct HijackedConnection {
    stream: TcpStream,
}

impl HijackedConnection {
    /// Access the raw stream.
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Disable Nagle so single-byte writes leave immediately.
    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.stream.set_nodelay(nodelay)
    }

    /// Close the connection without writing anything.
    pub async fn close(mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

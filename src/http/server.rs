//! HTTP server setup and connection serving.
//!
//! # Responsibilities
//! - Create Axum Router with the single catch-all handler
//! - Run the accept loop and tag each connection with its ID
//! - Serve every connection with hyper's HTTP/1 builder over a hijackable
//!   transport
//! - Inject the connection context and hijack capability into requests
//! - Cancel contexts and drop connections on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::any;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::actions;
use crate::config::BadservConfig;
use crate::context::{CancelHandle, ExecContext};
use crate::http::request::RequestId;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionGuard;
use crate::net::listener::ConnectionPermit;
use crate::net::{ConnectionId, ConnectionTracker, HijackableStream, IdSequence, Listener, ListenerError};
use crate::observability::logging;

/// How long `run` waits for connection tasks to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine settings derived from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_body_size: usize,
    pub dump_requests: bool,
    pub slow_write_interval: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &BadservConfig) -> Self {
        Self {
            max_body_size: config.request.max_body_size,
            dump_requests: config.request.dump_requests,
            slow_write_interval: Duration::from_millis(config.actions.slow_write_interval_ms),
        }
    }
}

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub request_ids: Arc<IdSequence<RequestId>>,
    pub settings: Arc<EngineSettings>,
}

impl AppState {
    pub fn new(config: &BadservConfig) -> Self {
        Self {
            request_ids: Arc::new(IdSequence::new()),
            settings: Arc::new(EngineSettings::from_config(config)),
        }
    }
}

/// HTTP server for badserv.
pub struct HttpServer {
    router: Router,
    config: BadservConfig,
    connection_ids: IdSequence<ConnectionId>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BadservConfig) -> Self {
        let state = AppState::new(&config);
        let router = Self::build_router(state);
        Self {
            router,
            config,
            connection_ids: IdSequence::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(actions::handle))
            .route("/", any(actions::handle))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Handle on the live connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    fn http1_builder(&self) -> http1::Builder {
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(Duration::from_secs(
                self.config.listener.header_read_timeout_secs,
            ))
            .keep_alive(true);
        builder
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Listening HTTP");

        let builder = Arc::new(self.http1_builder());

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown.recv() => break,
            };

            let (stream, peer_addr, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Closed) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            let conn_id = self.connection_ids.next_id();
            let (ctx, cancel) = ExecContext::for_connection(conn_id);
            let span = logging::connection_span(&ctx);
            span.in_scope(|| tracing::debug!(peer_addr = %peer_addr, "Serving connection"));

            let connection = ServedConnection {
                ctx,
                cancel,
                guard: self.tracker.track(conn_id),
                _permit: permit,
            };
            tokio::spawn(
                connection
                    .serve(Arc::clone(&builder), stream, self.router.clone(), shutdown.clone())
                    .instrument(span),
            );
        }

        tracing::info!("HTTP server stopping");
        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait_for_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                active = self.tracker.active_count(),
                "Connections still open after drain timeout"
            );
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Per-connection state owned by the connection task.
struct ServedConnection {
    ctx: ExecContext,
    cancel: CancelHandle,
    guard: ConnectionGuard,
    _permit: ConnectionPermit,
}

impl ServedConnection {
    async fn serve(
        self,
        builder: Arc<http1::Builder>,
        stream: TcpStream,
        router: Router,
        mut shutdown: ShutdownSignal,
    ) {
        let (transport, hijacker) = HijackableStream::new(stream);

        let service = {
            let ctx = self.ctx.clone();
            let hijacker = hijacker.clone();
            service_fn(move |request: Request<Incoming>| {
                let mut request = request.map(Body::new);
                request.extensions_mut().insert(ctx.clone());
                request.extensions_mut().insert(hijacker.clone());
                router.clone().oneshot(request)
            })
        };

        let conn = builder.serve_connection(TokioIo::new(transport), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => match result {
                Ok(()) => tracing::debug!("Connection finished"),
                Err(_) if hijacker.is_hijacked() => tracing::debug!("Connection handed off to handler"),
                Err(e) if e.is_incomplete_message() => tracing::debug!("Peer closed connection mid-request"),
                Err(e) => tracing::debug!(target: "badserv::net::http", error = %e, "Serving connection"),
            },
            _ = shutdown.recv() => {
                tracing::debug!("Dropping connection on shutdown");
            }
        }

        self.cancel.cancel();
        tracing::trace!(conn_id = %self.guard.id(), "Connection context cancelled");
    }
}

//! Per-request dispatcher.
//!
//! # Responsibilities
//! - Assign the request ID and enter the request span
//! - Read and dump the request before any action runs
//! - Map the `action` query parameter to a connection behavior
//!
//! # Design Decisions
//! - `close` and `slow-write` leave the response machinery through the
//!   connection's [`Hijacker`]; whatever they return afterwards is discarded
//!   by the transport
//! - `hang` only waits on the context. Under hyper, a departed peer or
//!   server shutdown ends the connection task, which drops the waiting
//!   future; the context is cancelled right after. Either way nothing is
//!   written and the release is logged

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::Instrument;

use crate::actions::slow_write::{self, SlowWriteError};
use crate::actions::{Action, DOCUMENT, DOCUMENT_NAME};
use crate::context::ExecContext;
use crate::http::request::BufferedRequest;
use crate::http::response::{error_response, serve_content};
use crate::http::server::AppState;
use crate::net::{HijackError, Hijacker};
use crate::observability::logging;

/// Failure of a connection-level action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("hijacking connection: {0}")]
    Hijack(#[from] HijackError),
    #[error("closing connection: {0}")]
    Close(#[source] std::io::Error),
    #[error(transparent)]
    Write(#[from] SlowWriteError),
}

/// Entry point for every request, whatever the path.
///
/// The connection task stores the connection's [`ExecContext`] and
/// [`Hijacker`] in the request extensions. Requests arriving without them
/// (e.g. driven directly through the router) get a detached context and
/// cannot be hijacked.
pub async fn handle(State(state): State<AppState>, request: Request<Body>) -> Response {
    let conn_ctx = request
        .extensions()
        .get::<ExecContext>()
        .cloned()
        .unwrap_or_else(ExecContext::detached);
    let ctx = conn_ctx.with_request_id(state.request_ids.next_id());
    let span = logging::request_span(&ctx);
    let hijacker = request.extensions().get::<Hijacker>().cloned();

    dispatch(&state, &ctx, hijacker.as_ref(), request)
        .instrument(span)
        .await
}

async fn dispatch(
    state: &AppState,
    ctx: &ExecContext,
    hijacker: Option<&Hijacker>,
    request: Request<Body>,
) -> Response {
    let request = match BufferedRequest::read(request, state.settings.max_body_size).await {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "Dumping request");
            return error_response(StatusCode::BAD_REQUEST, format!("bad request: {e}"));
        }
    };

    if state.settings.dump_requests {
        println!("---\n{}\n---\n", request.dump());
    }

    let action = Action::parse(request.query_param("action").as_deref().unwrap_or(""));
    tracing::info!(action = %action, path = %request.parts.uri.path(), "handling");

    match action {
        Action::Default => serve_content(
            &request.parts.method,
            &request.parts.headers,
            DOCUMENT_NAME,
            Utc::now(),
            DOCUMENT.as_bytes(),
        ),
        Action::Hang => hang(ctx).await,
        Action::Close => match close_connection(hijacker).await {
            Ok(()) => hijacked_response(),
            Err(e) => {
                tracing::error!(error = %e, "Closing connection");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "can't properly close connection",
                )
            }
        },
        Action::SlowWrite => {
            match slow_write(hijacker, &request, state.settings.slow_write_interval).await {
                Ok(()) => hijacked_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Writing response");
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "can't properly write response",
                    )
                }
            }
        }
        Action::Unknown(name) => {
            tracing::debug!(action = %name, "Unknown action");
            error_response(StatusCode::BAD_REQUEST, "unknown action")
        }
    }
}

/// Placeholder returned once the connection has been taken. The transport
/// refuses writes after a hijack, so it never reaches the client.
fn hijacked_response() -> Response {
    StatusCode::OK.into_response()
}

/// Logs when a hanging request lets go, whether it was cancelled or dropped.
struct HangRelease;

impl Drop for HangRelease {
    fn drop(&mut self) {
        tracing::info!("Hang released");
    }
}

async fn hang(ctx: &ExecContext) -> Response {
    tracing::debug!("Hanging until the connection goes away");
    let _release = HangRelease;
    ctx.cancelled().await;
    hijacked_response()
}

async fn close_connection(hijacker: Option<&Hijacker>) -> Result<(), ActionError> {
    tracing::info!("Hijacking connection");
    let conn = hijacker.ok_or(HijackError::Unsupported)?.hijack()?;
    conn.close().await.map_err(ActionError::Close)
}

async fn slow_write(
    hijacker: Option<&Hijacker>,
    request: &BufferedRequest,
    interval: Duration,
) -> Result<(), ActionError> {
    tracing::info!("Hijacking connection");
    let mut conn = hijacker.ok_or(HijackError::Unsupported)?.hijack()?;

    if let Err(e) = conn.set_nodelay(true) {
        tracing::warn!(error = %e, "Disabling Nagle on hijacked connection");
    }

    tracing::info!("Writing slow response");
    let response = slow_write::build_response(request.host(), DOCUMENT.as_bytes());
    slow_write::write_slowly(conn.stream_mut(), &response, interval).await?;

    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "Closing connection after slow response");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BadservConfig;
    use crate::net::ConnectionId;
    use axum::routing::any;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn router() -> Router {
        let mut config = BadservConfig::default();
        config.request.dump_requests = false;
        Router::new()
            .route("/", any(handle))
            .route("/{*path}", any(handle))
            .with_state(AppState::new(&config))
    }

    async fn call(uri: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn default_serves_document() {
        let (status, body) = call("/any/path").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, DOCUMENT);
    }

    #[tokio::test]
    async fn unknown_action_is_bad_request() {
        let (status, body) = call("/?action=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "unknown action\n");
    }

    #[tokio::test]
    async fn close_without_transport_is_server_error() {
        let (status, body) = call("/?action=close").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "can't properly close connection\n");
    }

    #[tokio::test]
    async fn slow_write_without_transport_is_server_error() {
        let (status, body) = call("/?action=slow-write").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "can't properly write response\n");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_dispatch() {
        let mut config = BadservConfig::default();
        config.request.dump_requests = false;
        config.request.max_body_size = 4;
        let app = Router::new()
            .route("/", any(handle))
            .with_state(AppState::new(&config));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/?action=close")
                    .body(Body::from("far too long"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn request_ids_increase_per_dispatch() {
        let mut config = BadservConfig::default();
        config.request.dump_requests = false;
        let state = AppState::new(&config);
        let app = Router::new()
            .route("/", any(handle))
            .with_state(state.clone());

        for _ in 0..3 {
            app.clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
        }
        assert_eq!(state.request_ids.next_id().as_u64(), 4);
    }

    #[tokio::test]
    async fn hang_waits_for_connection_context() {
        let (ctx, cancel) = ExecContext::for_connection(ConnectionId::from(1));
        let mut request = Request::builder()
            .uri("/?action=hang")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ctx);

        let pending = tokio::spawn(router().oneshot(request));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("hang released by cancellation")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn hang_on_detached_context_never_returns() {
        let request = Request::builder()
            .uri("/?action=hang")
            .body(Body::empty())
            .unwrap();
        let waited =
            tokio::time::timeout(Duration::from_millis(50), router().oneshot(request)).await;
        assert!(waited.is_err());
    }
}

//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (level, format, stderr output)
//! - Derive spans from an [`ExecContext`] so every event emitted while
//!   handling a connection or request carries `conn_id` and `request_id`
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Text format by default, JSON when configured
//! - Absent identifiers are left unrecorded rather than logged as empty

use tracing::field;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::context::ExecContext;

/// Error type for logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter from `RUST_LOG` or the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(config.log_level.to_ascii_lowercase())?),
    }
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    Ok(())
}

/// Span for work done on behalf of a connection.
pub fn connection_span(ctx: &ExecContext) -> Span {
    let span = tracing::info_span!("connection", conn_id = field::Empty);
    if let Some(conn_id) = ctx.conn_id() {
        span.record("conn_id", conn_id.as_u64());
    }
    span
}

/// Span for work done on behalf of a single request.
///
/// Created detached from the current span so a connection's fields are not
/// repeated; the request span carries both identifiers itself.
pub fn request_span(ctx: &ExecContext) -> Span {
    let span = tracing::info_span!(
        parent: None,
        "request",
        conn_id = field::Empty,
        request_id = field::Empty
    );
    if let Some(conn_id) = ctx.conn_id() {
        span.record("conn_id", conn_id.as_u64());
    }
    if let Some(request_id) = ctx.request_id() {
        span.record("request_id", request_id.as_u64());
    }
    span
}

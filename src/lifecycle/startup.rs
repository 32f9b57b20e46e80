//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener from validated configuration
//! - Wire OS signals to the shutdown coordinator
//! - Run the HTTP server until shutdown
//!
//! # Design Decisions
//! - Fail fast: a bind error is fatal
//! - A signal-driven shutdown is a normal exit

use crate::config::BadservConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};

/// Fatal startup or serving error.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("listening: {0}")]
    Listen(#[from] ListenerError),
    #[error("serving HTTP: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bind, serve, and return once a shutdown signal has been handled.
pub async fn run(config: BadservConfig) -> Result<(), StartupError> {
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(config).run(listener, signal).await?;

    tracing::info!("Bye!");
    Ok(())
}

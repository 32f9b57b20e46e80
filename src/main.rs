//! badserv command-line entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                   BADSERV                    │
//!   Client request      │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ────────────────────┼─▶│   net    │──▶│   http   │──▶│ actions  │  │
//!                       │  │ listener │   │  server  │   │  engine  │  │
//!                       │  │ conn id  │   │ req id   │   └────┬─────┘  │
//!                       │  └──────────┘   └──────────┘        │        │
//!                       │        ▲                            │        │
//!   Fault / response    │        │      hijack (close,        │        │
//!   ◀───────────────────┼────────┴──────── slow-write) ◀──────┘        │
//!                       │                                              │
//!                       │  config · observability · lifecycle          │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use badserv::config::{load_config, validate_config, BadservConfig, ConfigError};
use badserv::lifecycle::startup;
use badserv::observability::logging;

const ABOUT: &str = "badserv is a HTTP server that can be used to test HTTP clients.";

const LONG_ABOUT: &str = "badserv is a HTTP server that can be used to test HTTP clients.
Client can force server to perform an action by passing 'action' query parameter.

Available actions:
  - hang: server will hang on request until client closes connection
  - close: server will close connection without HTTP response
  - slow-write: server will write response slowly, byte by byte, 10 byte/s";

#[derive(Parser, Debug)]
#[command(name = "badserv", version, about = ABOUT, long_about = LONG_ABOUT)]
struct Cli {
    /// Address to serve HTTP requests
    #[arg(long = "http", value_name = "ADDR")]
    http: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error) [default: info]
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Optional TOML configuration file; flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<BadservConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BadservConfig::default(),
        };

        if let Some(http) = self.http {
            config.listener.bind_address = http;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        slow_write_interval_ms = config.actions.slow_write_interval_ms,
        "Configuration loaded"
    );

    startup::run(config).await?;
    Ok(())
}

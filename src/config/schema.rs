//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for badserv.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BadservConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Inbound request handling limits.
    pub request: RequestConfig,

    /// Tuning for the fault actions.
    pub actions: ActionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "localhost:7080"). Host names are resolved.
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long a client may take to send the request head.
    pub header_read_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost:7080".to_string(),
            max_connections: 10_000,
            header_read_timeout_secs: 3600,
        }
    }
}

/// Request handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Maximum body size in bytes read before dispatch.
    pub max_body_size: usize,

    /// Print every request to stdout before handling it.
    pub dump_requests: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            dump_requests: true,
        }
    }
}

/// Fault action configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Pause between bytes for `slow-write`, in milliseconds.
    pub slow_write_interval_ms: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            slow_write_interval_ms: 100,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = BadservConfig::default();
        assert_eq!(config.listener.bind_address, "localhost:7080");
        assert_eq!(config.actions.slow_write_interval_ms, 100);
        assert_eq!(config.observability.log_format, LogFormat::Text);
        assert!(config.request.dump_requests);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BadservConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.listener.max_connections, 10_000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, log level known)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BadservConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use tracing::level_filters::LevelFilter;

use crate::config::schema::BadservConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,
    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,
    #[error("request.max_body_size must be greater than zero")]
    ZeroBodyLimit,
    #[error("actions.slow_write_interval_ms must be greater than zero")]
    ZeroSlowWriteInterval,
    #[error("observability.log_level {0:?} is not a known level")]
    UnknownLogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &BadservConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.request.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.actions.slow_write_interval_ms == 0 {
        errors.push(ValidationError::ZeroSlowWriteInterval);
    }
    if config.observability.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

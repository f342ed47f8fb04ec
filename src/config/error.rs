//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid broker URL format")]
    InvalidBrokerUrl,

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("pong_wait_secs must exceed ping_interval_secs")]
    PingOutlastsPongWait,

    #[error("Invalid directory entry: {0}")]
    InvalidDirectoryEntry(String),
}

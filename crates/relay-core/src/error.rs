//! Error types shared by the relay crates

use thiserror::Error;

/// Result type for calls into the host application
pub type HostResult<T> = Result<T, HostError>;

/// Errors reported by host collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host refused the request (unknown profile, busy pipeline, ...)
    #[error("Host rejected request: {0}")]
    Rejected(String),

    /// The capability is not available in this host
    #[error("Host capability unavailable: {0}")]
    Unavailable(String),

    /// Persisting chat or settings failed
    #[error("Host I/O failed: {0}")]
    Io(String),
}

/// Error type for runtime configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

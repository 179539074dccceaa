//! Error types for addrsync
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for addrsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for addrsync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at construction time)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Public IP discovery errors
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Record service errors
    #[error("Service error ({service}): {message}")]
    Service {
        /// Service name
        service: String,
        /// Error message
        message: String,
    },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML decoding errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a service-specific error
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// When a failed submission may be attempted again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    /// Eligible again on the next tick
    NextTick,
    /// Eligible again once the delay has elapsed
    Delay(Duration),
    /// Permanent failure: do not submit again for the life of the process
    Never,
}

impl RetryAfter {
    /// The cooldown as a duration, `None` for permanent failures
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            RetryAfter::NextTick => Some(Duration::ZERO),
            RetryAfter::Delay(delay) => Some(*delay),
            RetryAfter::Never => None,
        }
    }
}

impl std::fmt::Display for RetryAfter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryAfter::NextTick => write!(f, "next tick"),
            RetryAfter::Delay(delay) => write!(f, "{:?}", delay),
            RetryAfter::Never => write!(f, "never"),
        }
    }
}

/// A failed submission together with the provider's retry advice
#[derive(Error, Debug)]
#[error("{error}")]
pub struct SubmitError {
    /// What went wrong
    #[source]
    pub error: Error,
    /// When the record may be submitted again
    pub retry: RetryAfter,
}

impl SubmitError {
    /// Create a submission error with explicit retry advice
    pub fn new(error: Error, retry: RetryAfter) -> Self {
        Self { error, retry }
    }

    /// Failure that may be retried on the next tick (transport errors)
    pub fn next_tick(error: Error) -> Self {
        Self::new(error, RetryAfter::NextTick)
    }

    /// Failure with a provider cooldown
    pub fn cooldown(error: Error, delay: Duration) -> Self {
        Self::new(error, RetryAfter::Delay(delay))
    }

    /// Failure that must not be retried
    pub fn permanent(error: Error) -> Self {
        Self::new(error, RetryAfter::Never)
    }
}

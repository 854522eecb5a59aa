//! Error types for the publisher framework.

use thiserror::Error;

/// Result type alias using [`PublisherError`].
pub type Result<T> = std::result::Result<T, PublisherError>;

/// Errors that can occur while running a telemetry publisher.
///
/// Startup aborts on configuration, connection and topology errors. Once
/// the loop is running only [`PublisherError::ConnectionLost`] and
/// [`PublisherError::Serialization`] stop it; see
/// [`PublisherError::is_fatal_in_loop`].
#[derive(Error, Debug)]
pub enum PublisherError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration validation error.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Broker unreachable or credentials rejected.
    #[error("Broker connection error: {0}")]
    Connection(String),

    /// Exchange, queue or binding declaration failed.
    #[error("Topology declaration failed for {object}: {message}")]
    Topology { object: String, message: String },

    /// A single publish failed while the connection stayed up.
    #[error("Failed to publish to {routing_key}: {message}")]
    Publish {
        routing_key: String,
        message: String,
    },

    /// The broker connection or channel dropped, or the session was already
    /// closed.
    #[error("Broker connection lost: {0}")]
    ConnectionLost(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublisherError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a configuration validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a topology error for the named exchange, queue or binding.
    pub fn topology(object: impl Into<String>, message: impl ToString) -> Self {
        Self::Topology {
            object: object.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must stop a running publish loop.
    ///
    /// A plain publish failure only costs one sample.
    pub fn is_fatal_in_loop(&self) -> bool {
        !matches!(self, Self::Publish { .. })
    }
}

impl From<serde_json::Error> for PublisherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<fleetmon_common::Error> for PublisherError {
    fn from(err: fleetmon_common::Error) -> Self {
        match err {
            fleetmon_common::Error::Config(msg) => Self::Config(msg),
            fleetmon_common::Error::Io(e) => Self::Io(e),
            other => Self::Serialization(other.to_string()),
        }
    }
}

use thiserror::Error;

/// Common error type for fleetmon components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A numeric field held NaN or infinity and cannot be put on the wire.
    #[error("Non-finite value in field '{field}'")]
    NonFiniteValue { field: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using fleetmon's Error.
pub type Result<T> = std::result::Result<T, Error>;

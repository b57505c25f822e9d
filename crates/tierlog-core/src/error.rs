//! Error types for tierlog.

use thiserror::Error;

/// Result type alias using tierlog's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tierlog operations.
///
/// None of these ever reach a caller of the logging API; they flow between
/// the pipeline tiers and decide whether a batch is re-buffered, dropped,
/// or reported through the health state.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Intermediate buffer (Redis) operation failed
    #[error("Redis error: {0}")]
    Redis(String),

    /// A downstream tier is not reachable right now
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error means "try again later" rather than "this will never work".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Redis(_) | Error::Unavailable(_) | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Redis(e.to_string())
    }
}

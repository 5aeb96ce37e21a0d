//! Error types for Quiver Core

use thiserror::Error;

/// Result type alias using Quiver Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Quiver graph engine
#[derive(Error, Debug)]
pub enum Error {
    /// Binary decode errors (malformed bulk payloads)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Query executor errors
    #[error("Executor error: {0}")]
    Executor(String),

    /// Node or relationship not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an executor error
    pub fn executor(msg: impl Into<String>) -> Self {
        Self::Executor(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

//! Common error types for StemForge

use thiserror::Error;

/// Common result type for StemForge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across StemForge services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter, rejected at the boundary
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Durable storage fault (disk unavailable, permissions, torn layout)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

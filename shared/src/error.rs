//! Error types for the staff relay Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the directory store or LINE.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading from the directory store failed
    #[error("Store query failed: {0}")]
    StoreQuery(String),

    /// Writing to the directory store failed
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// LINE Messaging API error
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
}

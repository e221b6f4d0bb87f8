use thiserror::Error;

/// Errors surfaced by shelf operations
#[derive(Error, Debug)]
pub enum ShelfError {
    /// No usable session token was presented where one is required
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Record absent or owned by another session. Both cases share this variant.
    #[error("Not Found")]
    NotFound,

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

/// Result type for shelf operations
pub type ShelfResult<T> = Result<T, ShelfError>;

use shelf_core::ShelfError;
use thiserror::Error;

/// Error type for record store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id is already stored
    #[error("Record already exists: {0}")]
    Conflict(String),
    /// Error occurred inside a backend
    #[error("Storage error: {0}")]
    Storage(String),
    /// A stored row could not be turned back into a record
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl From<StoreError> for ShelfError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ShelfError::Conflict(msg),
            other => ShelfError::Storage(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

//! Error types for the persisted event journal.

use arbor_types::RepositoryError;

/// Errors raised by the SQLite journal store.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// A database operation failed.
    #[error("journal database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection was available.
    #[error("journal connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// An event could not be serialised or a stored payload was corrupt.
    #[error("journal serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<JournalError> for RepositoryError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Serialization(e) => RepositoryError::Serialization(e),
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

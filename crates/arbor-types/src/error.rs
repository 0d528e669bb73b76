//! The repository-level error shared by every operation.

/// Errors surfaced by observation and query-result operations.
///
/// Every public operation in the workspace reports failure through this one
/// type. Callers treat any variant as terminal for the call that produced it.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A path was relative or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A filter was empty or used an unsupported combination of restrictions.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The rows or nodes of a query result were already retrieved.
    #[error("query result already consumed")]
    ResultConsumed,

    /// Node access was requested on a result with more than one selector.
    #[error("node access is ambiguous for a query with {0} selectors")]
    AmbiguousSelector(usize),

    /// A selector name does not belong to the originating query.
    #[error("unknown selector: {0}")]
    UnknownSelector(String),

    /// A column name does not belong to the result.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// An iterator was asked to skip past its last element.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// The session or observation manager has been closed.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// The backing store failed or does not support the operation.
    #[error("repository backend error: {0}")]
    Backend(String),

    /// Persistent storage failed.
    #[error("repository database error: {0}")]
    Database(String),

    /// JSON serialization or deserialization failed.
    #[error("repository serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

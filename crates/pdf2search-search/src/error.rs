//! Error types for the search crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport-level failure talking to Elasticsearch.
    #[error("elasticsearch request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Elasticsearch answered with a non-success status the caller
    /// did not expect.
    #[error("elasticsearch returned {status} for {method} {path}: {body}")]
    UnexpectedStatus {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// A physical index name that is not `<alias>_v<N>`.
    #[error("invalid versioned index name: {name:?} (expected {alias}_v<N>)")]
    InvalidIndexName { alias: String, name: String },

    /// Rollback or migrate with no alias to operate on.
    #[error("no index exists for alias {alias:?}")]
    NoIndex { alias: String },

    /// Rollback at version 1.
    #[error("cannot rollback past v1 (current index: {current})")]
    CannotRollbackPastV1 { current: String },

    /// Rollback when the previous physical index has been deleted.
    #[error("previous index {index} does not exist; cannot rollback")]
    PreviousIndexMissing { index: String },
}

pub type Result<T> = std::result::Result<T, SearchError>;

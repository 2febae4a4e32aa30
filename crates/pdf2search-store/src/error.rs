//! Error types for the store crate.

use pdf2search_core::{StateTransitionError, UnknownEnhancementType, UnknownStatus};
use thiserror::Error;

/// Errors that can occur against the PostgreSQL store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or statement failure; callers should treat this as
    /// fatal rather than retrying blindly.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A status change that is not an edge of the state machine. This
    /// is a programming bug; do not catch and swallow it.
    #[error(transparent)]
    Transition(#[from] StateTransitionError),

    /// `set_status` on a row that does not exist.
    #[error("pending enhancement id={0} not found")]
    PendingNotFound(i32),

    /// A stored row carries a status outside the closed set.
    #[error(transparent)]
    CorruptStatus(#[from] UnknownStatus),

    /// A stored row carries an enhancement type outside the closed set.
    #[error(transparent)]
    CorruptEnhancementType(#[from] UnknownEnhancementType),
}

pub type Result<T> = std::result::Result<T, StoreError>;

//! Identity store error types.

use thiserror::Error;

use crate::kv::KvError;

/// Identity store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Identifier, username, or email already registered; includes lost
    /// registration races
    #[error("email or username already registered")]
    DuplicateIdentity,

    /// Missing identity or refresh-token record
    #[error("no such record")]
    NotFound,

    /// An optimistic-concurrency precondition failed
    #[error("concurrent modification detected")]
    ConcurrencyConflict,

    /// Key-value engine failure
    #[error(transparent)]
    Kv(#[from] KvError),

    /// Record (de)serialization failed
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for identity store operations
pub type StoreResult<T> = Result<T, StoreError>;

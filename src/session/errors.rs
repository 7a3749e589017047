//! Session service error types.

use thiserror::Error;

use crate::identity::StoreError;
use crate::secrets::HashError;
use crate::token::TokenError;

/// Session service errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed registration or login input
    #[error("invalid input: {0}")]
    Validation(String),

    /// Identifier, username, or email already registered; includes lost
    /// registration races
    #[error("email or username already registered")]
    DuplicateIdentity,

    /// Missing identity or refresh-token record
    #[error("no such record")]
    NotFound,

    /// Unknown principal or password mismatch; deliberately
    /// undifferentiated
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Bad signature, expiry, or stored-hash mismatch on any token;
    /// deliberately undifferentiated
    #[error("invalid token")]
    InvalidToken,

    /// An optimistic-concurrency precondition failed; the caller may
    /// safely re-issue the same request
    #[error("concurrent modification detected")]
    ConcurrencyConflict,

    /// Signing failed while minting a token
    #[error("failed to create token")]
    TokenCreation(#[source] jsonwebtoken::errors::Error),

    /// Secret hashing failed
    #[error(transparent)]
    Hashing(#[from] HashError),

    /// Store failure outside the session taxonomy (I/O, serialization)
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateIdentity => AuthError::DuplicateIdentity,
            StoreError::NotFound => AuthError::NotFound,
            StoreError::ConcurrencyConflict => AuthError::ConcurrencyConflict,
            other => AuthError::Store(other),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Creation(source) => AuthError::TokenCreation(source),
            TokenError::Invalid => AuthError::InvalidToken,
        }
    }
}

/// Result type for session operations
pub type AuthResult<T> = Result<T, AuthError>;

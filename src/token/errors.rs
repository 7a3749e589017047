//! Token issuer error types.

use thiserror::Error;

/// Token issuer errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed while minting a token
    #[error("failed to create token")]
    Creation(#[source] jsonwebtoken::errors::Error),

    /// Bad signature, malformed structure, or expiry; deliberately
    /// undifferentiated
    #[error("invalid token")]
    Invalid,
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

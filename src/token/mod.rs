//! Signed access and refresh tokens.
//!
//! Tokens are self-contained HS256 JWTs asserting a subject and expiry,
//! signed with a process-wide secret. Access tokens are stateless;
//! refresh tokens are additionally tracked by the session layer as a
//! hash in the store. The issuer itself persists nothing.

pub mod errors;
pub mod issuer;

pub use errors::{TokenError, TokenResult};
pub use issuer::{Claims, TokenIssuer};

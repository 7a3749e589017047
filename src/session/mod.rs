//! Session lifecycle: register, login, refresh-rotate, logout.
//!
//! A user's session state is implicit in store contents: no
//! refresh-token record means no session, a live record means an active
//! one. Logout deletes the record; a successful refresh atomically
//! replaces it, invalidating the previous token the instant the new one
//! commits. Expired-but-present records are only discovered at the next
//! refresh attempt; there is no background sweeper.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::SessionManager;
pub use models::{LoginRequest, RegisterRequest, RegisteredProfile, SessionTokens, UserProfile};

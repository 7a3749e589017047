//! # Lectern
//!
//! Identity and session lifecycle management for an instructor
//! platform: registers users under globally unique identifiers,
//! authenticates credentials, and issues, rotates, and revokes signed
//! session tokens backed by a persistent store with
//! optimistic-concurrency guarantees.
//!
//! ## Architecture
//!
//! - [`kv`]: versioned key-value engine with atomic multi-key
//!   transactions
//! - [`identity`]: user and refresh-token persistence over the engine
//! - [`secrets`]: one-way hashing for passwords and token secrets
//! - [`token`]: signed access/refresh token issuance and validation
//! - [`session`]: the register/login/refresh/logout state machine
//!
//! Uniqueness of username, email, and identifier is enforced by storing
//! the same user record under three keys and committing all of them in
//! one atomic transaction; the store's compare-and-set primitive is the
//! only concurrency mechanism in the crate.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lectern::config::AuthConfig;
//! use lectern::identity::KvIdentityStore;
//! use lectern::kv::Kv;
//! use lectern::session::{RegisterRequest, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::development();
//!     let store = Arc::new(KvIdentityStore::new(Kv::in_memory()));
//!     let sessions = SessionManager::new(store, &config);
//!
//!     let profile = sessions
//!         .register(RegisterRequest {
//!             name: "Ada Lovelace".to_string(),
//!             username: "ada".to_string(),
//!             email: "ada@example.com".to_string(),
//!             password: "countess1".to_string(),
//!         })
//!         .await?;
//!     println!("registered {}", profile.email);
//!     Ok(())
//! }
//! ```

/// Versioned key-value engine with optimistic-concurrency transactions.
pub mod kv;

/// Persistent identity and refresh-token store.
pub mod identity;

/// One-way hashing for passwords and refresh-token secrets.
pub mod secrets;

/// Signed-token issuance and validation.
pub mod token;

/// Session lifecycle orchestration.
pub mod session;

/// Configuration management.
pub mod config;

pub use config::{AuthConfig, ConfigError};
pub use identity::{IdentityStore, KvIdentityStore};
pub use secrets::SecretHasher;
pub use session::{AuthError, AuthResult, SessionManager};
pub use token::TokenIssuer;

//! Identity data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role tag attached to every user.
///
/// A single flat tag today; serialized uppercase to match the persisted
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "INSTRUCTOR")]
    Instructor,
}

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Generated identifier, monotonically sortable
    pub id: String,
    /// Display name
    pub name: String,
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// One-way digest of the password
    pub password_hash: String,
    /// Role tag
    pub role: Role,
}

/// A fully-populated user record lacking only its identifier.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Persisted refresh-token record; at most one live record per user. A
/// new record fully replaces any prior one, and only the hash of the
/// token secret is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Owning user identifier (also the record's key)
    pub user_id: String,
    /// One-way digest of the current refresh-token secret
    pub token_hash: String,
    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
}

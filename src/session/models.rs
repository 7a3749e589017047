//! Session service request and response shapes.

use serde::{Deserialize, Serialize};

use crate::identity::Role;

/// Registration input: a candidate identity lacking its identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Minimal public profile returned by registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredProfile {
    pub name: String,
    pub email: String,
}

/// Read-only projection of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Access/refresh token pair issued on login and on each rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

//! Configuration management.
//!
//! Consolidates environment variable reads for the secrets, token, and
//! store components. Secrets are sourced from the environment at
//! startup and never embedded in source.

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing
    #[error("missing required environment variable {var} ({hint})")]
    MissingRequired { var: String, hint: String },

    /// A variable is present but fails validation
    #[error("invalid {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Authentication core configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Process-wide token signing secret
    pub signing_secret: String,

    /// Server-side pepper mixed into every hashed secret
    pub password_pepper: String,

    /// Access token time-to-live
    pub access_ttl: Duration,

    /// Refresh token time-to-live
    pub refresh_ttl: Duration,

    /// Snapshot file for the key-value store; `None` keeps state in
    /// memory only
    pub store_path: Option<PathBuf>,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `JWT_SECRET`: token signing secret (required, at least 32 chars)
    /// - `PASSWORD_PEPPER`: hashing pepper (required, at least 16 chars)
    /// - `ACCESS_TOKEN_TTL_SECS`: access token lifetime (default: 900)
    /// - `REFRESH_TOKEN_TTL_SECS`: refresh token lifetime (default: 2592000)
    /// - `KV_STORE_PATH`: snapshot file path (default: in-memory)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or too short
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "generate with: openssl rand -hex 32".to_string(),
        })?;
        if signing_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "must be at least 32 characters".to_string(),
            });
        }

        let password_pepper =
            env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "generate with: openssl rand -hex 16".to_string(),
            })?;
        if password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "must be at least 16 characters".to_string(),
            });
        }

        Ok(Self {
            signing_secret,
            password_pepper,
            access_ttl: Duration::seconds(parse_env_or("ACCESS_TOKEN_TTL_SECS", 900)),
            refresh_ttl: Duration::seconds(parse_env_or("REFRESH_TOKEN_TTL_SECS", 2_592_000)),
            store_path: env::var("KV_STORE_PATH").ok().map(PathBuf::from),
        })
    }

    /// Fixed non-production values for development and tests
    pub fn development() -> Self {
        Self {
            signing_secret: "development-signing-secret-0123456789ab".to_string(),
            password_pepper: "development-pepper".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
            store_path: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Parse an optional environment variable with a fallback default
fn parse_env_or(var: &str, default: i64) -> i64 {
    env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

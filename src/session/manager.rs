//! Session manager implementation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::errors::{AuthError, AuthResult};
use super::models::{
    LoginRequest, RegisterRequest, RegisteredProfile, SessionTokens, UserProfile,
};
use crate::config::AuthConfig;
use crate::identity::{IdentityStore, NewUser, RefreshTokenRecord, Role, StoreError};
use crate::kv::Versionstamp;
use crate::secrets::SecretHasher;
use crate::token::{Claims, TokenIssuer};

/// Orchestrates register, login, refresh, and logout over the identity
/// store, secret hasher, and token issuer.
///
/// Holds no mutable state of its own; every mutation goes through the
/// store's optimistic transactions, so one instance is safe for
/// unlimited concurrent callers.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn IdentityStore>,
    hasher: SecretHasher,
    issuer: TokenIssuer,
}

impl SessionManager {
    /// Create a new session manager
    ///
    /// # Arguments
    ///
    /// * `store` - Identity store handle, constructed once at process start
    /// * `config` - Signing secret, pepper, and token lifetimes
    pub fn new(store: Arc<dyn IdentityStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            hasher: SecretHasher::new(config.password_pepper.clone()),
            issuer: TokenIssuer::new(&config.signing_secret, config.access_ttl, config.refresh_ttl),
        }
    }

    /// Register a new identity and return its minimal public profile.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed input
    /// * `AuthError::DuplicateIdentity` - Username, email, or id taken,
    ///   including losses to a concurrent registration
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<RegisteredProfile> {
        validate_registration(&request)?;
        let password_hash = self.hasher.hash(&request.password)?;
        let user = self
            .store
            .create_user(NewUser {
                name: request.name,
                username: request.username,
                email: request.email,
                password_hash,
                role: Role::Instructor,
            })
            .await?;
        Ok(RegisteredProfile {
            name: user.name,
            email: user.email,
        })
    }

    /// Authenticate credentials and open a session.
    ///
    /// Lookup failure and password mismatch are indistinguishable to the
    /// caller.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<SessionTokens> {
        let user = self
            .store
            .get_user(&request.username)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => AuthError::InvalidCredentials,
                other => other.into(),
            })?;

        if !self.hasher.verify(&request.password, &user.password_hash) {
            log::warn!("failed login attempt for {}", request.username);
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(&user.id, None).await
    }

    /// Read-only projection of a user record.
    pub async fn profile(&self, user_id: &str) -> AuthResult<UserProfile> {
        let user = self.store.get_user(user_id).await?;
        Ok(UserProfile {
            name: user.name,
            username: user.username,
            email: user.email,
            role: user.role,
        })
    }

    /// Every registered profile, deduplicated across the three keys each
    /// record is stored under.
    pub async fn list_instructors(&self) -> AuthResult<Vec<UserProfile>> {
        let mut seen = HashSet::new();
        let mut profiles = Vec::new();
        for user in self.store.list_users("").await? {
            if seen.insert(user.id.clone()) {
                profiles.push(UserProfile {
                    name: user.name,
                    username: user.username,
                    email: user.email,
                    role: user.role,
                });
            }
        }
        Ok(profiles)
    }

    /// Every stored refresh-token record.
    pub async fn list_refresh_tokens(&self) -> AuthResult<Vec<RefreshTokenRecord>> {
        Ok(self.store.list_refresh_tokens("").await?)
    }

    /// Rotate the caller's refresh token.
    ///
    /// On success the previous token is unusable the instant the new
    /// record commits. A failed verification leaves the stored record
    /// untouched, and a lost race against a concurrent rotation
    /// surfaces as `AuthError::ConcurrencyConflict` without retrying.
    ///
    /// # Errors
    ///
    /// * `AuthError::NotFound` - No record exists for the user
    /// * `AuthError::InvalidToken` - Hash mismatch or expired record
    /// * `AuthError::ConcurrencyConflict` - A concurrent rotation won
    pub async fn refresh(&self, presented_token: &str, user_id: &str) -> AuthResult<SessionTokens> {
        let (record, observed) = self.store.get_refresh_token(user_id).await?;
        self.verify_presented(presented_token, &record)?;
        let tokens = self.open_session(user_id, Some(observed)).await?;
        log::debug!("rotated refresh token for {user_id}");
        Ok(tokens)
    }

    /// Close the session by deleting the stored record.
    ///
    /// Returns `false` when the record was already gone by commit time;
    /// a failed verification leaves the record intact.
    pub async fn logout(&self, presented_token: &str, user_id: &str) -> AuthResult<bool> {
        let (record, _) = self.store.get_refresh_token(user_id).await?;
        self.verify_presented(presented_token, &record)?;
        let deleted = self.store.delete_refresh_token(user_id).await?;
        if deleted {
            log::info!("logged out {user_id}");
        }
        Ok(deleted)
    }

    /// Validate a bearer access token on behalf of the transport layer
    /// and return its claims.
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        Ok(self.issuer.validate_token(token)?)
    }

    /// Issue a fresh token pair and commit the hashed refresh token,
    /// conditioned on `observed` when rotating an existing record.
    async fn open_session(
        &self,
        user_id: &str,
        observed: Option<Versionstamp>,
    ) -> AuthResult<SessionTokens> {
        let access_token = self.issuer.issue_access_token(user_id)?;
        let refresh_token = self.issuer.issue_refresh_token(user_id)?;
        let token_hash = self.hasher.hash(&refresh_token)?;

        let issued_at = Utc::now();
        let record = RefreshTokenRecord {
            user_id: user_id.to_string(),
            token_hash,
            issued_at,
            expires_at: issued_at + self.issuer.refresh_ttl(),
        };
        self.store.put_refresh_token(&record, observed).await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    fn verify_presented(&self, presented: &str, record: &RefreshTokenRecord) -> AuthResult<()> {
        // An expired-but-present record is caught here, lazily; there is
        // no background sweeper.
        if record.expires_at < Utc::now() {
            return Err(AuthError::InvalidToken);
        }
        if !self.hasher.verify(presented, &record.token_hash) {
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }
}

fn validate_registration(request: &RegisterRequest) -> AuthResult<()> {
    if request.name.trim().is_empty() {
        return Err(AuthError::Validation("name must not be empty".to_string()));
    }

    let username_len = request.username.chars().count();
    if !(3..=20).contains(&username_len) {
        return Err(AuthError::Validation(
            "username must be 3-20 characters".to_string(),
        ));
    }
    if !request
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(AuthError::Validation(
            "username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    let valid_email = request
        .email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
    if !valid_email {
        return Err(AuthError::Validation(
            "email address is malformed".to_string(),
        ));
    }

    if request.password.chars().count() < 6 {
        return Err(AuthError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn assert_rejected(request: RegisterRequest) {
        assert!(matches!(
            validate_registration(&request),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn accepts_well_formed_registration() {
        assert!(validate_registration(&request("Alice", "alice", "alice@x.com", "secret1")).is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        assert_rejected(request("  ", "alice", "alice@x.com", "secret1"));
    }

    #[test]
    fn rejects_short_and_long_usernames() {
        assert_rejected(request("Alice", "al", "alice@x.com", "secret1"));
        assert_rejected(request("Alice", &"a".repeat(21), "alice@x.com", "secret1"));
    }

    #[test]
    fn rejects_username_with_punctuation() {
        assert_rejected(request("Alice", "alice!", "alice@x.com", "secret1"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert_rejected(request("Alice", "alice", "alice", "secret1"));
        assert_rejected(request("Alice", "alice", "@x.com", "secret1"));
        assert_rejected(request("Alice", "alice", "alice@nodot", "secret1"));
        assert_rejected(request("Alice", "alice", "alice@x.com.", "secret1"));
    }

    #[test]
    fn rejects_short_password() {
        assert_rejected(request("Alice", "alice", "alice@x.com", "short"));
    }
}

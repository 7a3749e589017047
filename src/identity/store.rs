//! Identity store contract and its key-value implementation.

use async_trait::async_trait;
use ulid::Ulid;

use super::errors::{StoreError, StoreResult};
use super::models::{NewUser, RefreshTokenRecord, User};
use crate::config::AuthConfig;
use crate::kv::{Kv, Versionstamp};

/// Key namespace holding user records, keyed by id, username, and email.
pub const IDENTITY_PREFIX: &str = "identity/";

/// Key namespace holding refresh-token records, keyed by user id.
pub const SESSION_PREFIX: &str = "session/";

fn identity_key(part: &str) -> String {
    format!("{IDENTITY_PREFIX}{part}")
}

fn session_key(user_id: &str) -> String {
    format!("{SESSION_PREFIX}{user_id}")
}

/// Persistence contract for user and refresh-token records.
///
/// Constructed once at process start and injected into the session
/// service, so tests can substitute doubles.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Generate an identifier for `candidate` and commit the record
    /// under its id, username, and email keys in one atomic
    /// transaction.
    ///
    /// Fails with `StoreError::DuplicateIdentity` if any of the three
    /// keys is already taken or a concurrent writer commits first;
    /// nothing is partially applied and no retry is attempted.
    async fn create_user(&self, candidate: NewUser) -> StoreResult<User>;

    /// Point lookup by id, username, or email.
    async fn get_user(&self, key: &str) -> StoreResult<User>;

    /// User records whose key continues `prefix`, in key order.
    ///
    /// A record appears once per key it is stored under; callers that
    /// need distinct users deduplicate by id.
    async fn list_users(&self, prefix: &str) -> StoreResult<Vec<User>>;

    /// Current refresh-token record for `user_id` and the versionstamp
    /// it was read at.
    async fn get_refresh_token(
        &self,
        user_id: &str,
    ) -> StoreResult<(RefreshTokenRecord, Versionstamp)>;

    /// Refresh-token records whose key continues `prefix`, in key order.
    async fn list_refresh_tokens(&self, prefix: &str) -> StoreResult<Vec<RefreshTokenRecord>>;

    /// Overwrite (or create) the record for `record.user_id`.
    ///
    /// With `observed`, the commit is conditioned on the versionstamp a
    /// prior `get_refresh_token` returned, so verify-then-replace forms
    /// one optimistic transaction; without it the current version is
    /// read inside the call. Either way, a competing commit between
    /// read and write fails with `StoreError::ConcurrencyConflict`.
    async fn put_refresh_token(
        &self,
        record: &RefreshTokenRecord,
        observed: Option<Versionstamp>,
    ) -> StoreResult<()>;

    /// Delete the record for `user_id` under the same optimistic
    /// discipline.
    ///
    /// Returns `false` when the record is already absent or was raced
    /// away; callers treat that as an acceptable outcome.
    async fn delete_refresh_token(&self, user_id: &str) -> StoreResult<bool>;
}

/// [`IdentityStore`] over the versioned key-value engine.
#[derive(Clone)]
pub struct KvIdentityStore {
    kv: Kv,
}

impl KvIdentityStore {
    pub fn new(kv: Kv) -> Self {
        Self { kv }
    }

    /// Open a store as configured: snapshot-backed when a path is set,
    /// in-memory otherwise.
    pub async fn from_config(config: &AuthConfig) -> StoreResult<Self> {
        let kv = match &config.store_path {
            Some(path) => Kv::open(path).await?,
            None => Kv::in_memory(),
        };
        Ok(Self::new(kv))
    }
}

#[async_trait]
impl IdentityStore for KvIdentityStore {
    async fn create_user(&self, candidate: NewUser) -> StoreResult<User> {
        let user = User {
            id: Ulid::new().to_string(),
            name: candidate.name,
            username: candidate.username,
            email: candidate.email,
            password_hash: candidate.password_hash,
            role: candidate.role,
        };
        let bytes = serde_json::to_vec(&user)?;
        let id_key = identity_key(&user.id);
        let username_key = identity_key(&user.username);
        let email_key = identity_key(&user.email);

        // All three keys must be absent at commit time; a taken key or a
        // concurrently committed writer aborts the whole transaction.
        let committed = self
            .kv
            .atomic()
            .check(&id_key, None)
            .check(&username_key, None)
            .check(&email_key, None)
            .set(&id_key, bytes.clone())
            .set(&username_key, bytes.clone())
            .set(&email_key, bytes)
            .commit()
            .await?;
        if committed {
            log::info!("registered user {} ({})", user.username, user.id);
            Ok(user)
        } else {
            Err(StoreError::DuplicateIdentity)
        }
    }

    async fn get_user(&self, key: &str) -> StoreResult<User> {
        let (bytes, _) = self
            .kv
            .get(&identity_key(key))
            .await
            .ok_or(StoreError::NotFound)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list_users(&self, prefix: &str) -> StoreResult<Vec<User>> {
        let entries = self.kv.list_prefix(&identity_key(prefix)).await;
        entries
            .iter()
            .map(|(_, bytes)| serde_json::from_slice(bytes).map_err(StoreError::from))
            .collect()
    }

    async fn get_refresh_token(
        &self,
        user_id: &str,
    ) -> StoreResult<(RefreshTokenRecord, Versionstamp)> {
        let (bytes, version) = self
            .kv
            .get(&session_key(user_id))
            .await
            .ok_or(StoreError::NotFound)?;
        Ok((serde_json::from_slice(&bytes)?, version))
    }

    async fn list_refresh_tokens(&self, prefix: &str) -> StoreResult<Vec<RefreshTokenRecord>> {
        let entries = self.kv.list_prefix(&session_key(prefix)).await;
        entries
            .iter()
            .map(|(_, bytes)| serde_json::from_slice(bytes).map_err(StoreError::from))
            .collect()
    }

    async fn put_refresh_token(
        &self,
        record: &RefreshTokenRecord,
        observed: Option<Versionstamp>,
    ) -> StoreResult<()> {
        let key = session_key(&record.user_id);
        let expected = match observed {
            Some(version) => Some(version),
            None => self.kv.versionstamp(&key).await,
        };
        let bytes = serde_json::to_vec(record)?;
        let committed = self
            .kv
            .atomic()
            .check(&key, expected)
            .set(&key, bytes)
            .commit()
            .await?;
        if committed {
            Ok(())
        } else {
            Err(StoreError::ConcurrencyConflict)
        }
    }

    async fn delete_refresh_token(&self, user_id: &str) -> StoreResult<bool> {
        let key = session_key(user_id);
        let Some(version) = self.kv.versionstamp(&key).await else {
            return Ok(false);
        };
        let committed = self
            .kv
            .atomic()
            .check(&key, Some(version))
            .delete(&key)
            .commit()
            .await?;
        Ok(committed)
    }
}

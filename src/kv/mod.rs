//! Versioned key-value engine backing the identity store.
//!
//! Provides point reads and ordered prefix scans over string keys, plus
//! atomic multi-key transactions with optimistic-concurrency checks.
//! Every committed transaction advances a monotonic versionstamp; a
//! transaction commits only if every checked key still carries the
//! versionstamp the caller observed (`None` for an absent key). A failed
//! check aborts the whole transaction with nothing applied.
//!
//! Values are opaque bytes. When opened with a path, the full state is
//! snapshotted to disk after each committed transaction and reloaded on
//! the next open.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Monotonic version assigned to the keys written by a committed
/// transaction.
pub type Versionstamp = u64;

/// Key-value engine errors
#[derive(Debug, Error)]
pub enum KvError {
    /// Snapshot file I/O failed
    #[error("kv snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding failed
    #[error("kv snapshot encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Snapshot decoding failed
    #[error("kv snapshot decoding failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Result type for key-value operations
pub type KvResult<T> = Result<T, KvError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: Vec<u8>,
    version: Versionstamp,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    entries: BTreeMap<String, Entry>,
    last_version: Versionstamp,
}

/// Shared handle to the engine; clones refer to the same state.
#[derive(Clone)]
pub struct Kv {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<PathBuf>,
}

impl Kv {
    /// Create an engine with no backing file.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            snapshot_path: None,
        }
    }

    /// Open an engine backed by a snapshot file, loading existing state
    /// if the file is present.
    pub async fn open(path: impl Into<PathBuf>) -> KvResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let (state, _) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                state
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => State::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Some(path),
        })
    }

    /// Current value and versionstamp for `key`.
    pub async fn get(&self, key: &str) -> Option<(Vec<u8>, Versionstamp)> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.version))
    }

    /// Current versionstamp for `key`, if present.
    pub async fn versionstamp(&self, key: &str) -> Option<Versionstamp> {
        let state = self.state.read().await;
        state.entries.get(key).map(|entry| entry.version)
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub async fn list_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let state = self.state.read().await;
        state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Start building an atomic transaction.
    pub fn atomic(&self) -> AtomicOp {
        AtomicOp {
            kv: self.clone(),
            checks: Vec::new(),
            mutations: Vec::new(),
        }
    }
}

enum Mutation {
    Set(String, Vec<u8>),
    Delete(String),
}

/// Pending atomic transaction built against a [`Kv`] handle.
///
/// Checks and mutations accumulate until [`AtomicOp::commit`], which
/// applies either all mutations or none.
pub struct AtomicOp {
    kv: Kv,
    checks: Vec<(String, Option<Versionstamp>)>,
    mutations: Vec<Mutation>,
}

impl AtomicOp {
    /// Require `key` to still carry `expected` at commit time (`None`
    /// requires the key to be absent).
    pub fn check(mut self, key: &str, expected: Option<Versionstamp>) -> Self {
        self.checks.push((key.to_string(), expected));
        self
    }

    /// Write `value` under `key` if the transaction commits.
    pub fn set(mut self, key: &str, value: Vec<u8>) -> Self {
        self.mutations.push(Mutation::Set(key.to_string(), value));
        self
    }

    /// Remove `key` if the transaction commits.
    pub fn delete(mut self, key: &str) -> Self {
        self.mutations.push(Mutation::Delete(key.to_string()));
        self
    }

    /// Apply the transaction. Returns `Ok(true)` on commit and
    /// `Ok(false)` when any check failed; nothing is applied in the
    /// latter case.
    pub async fn commit(self) -> KvResult<bool> {
        let AtomicOp {
            kv,
            checks,
            mutations,
        } = self;
        let mut state = kv.state.write().await;

        for (key, expected) in &checks {
            let current = state.entries.get(key).map(|entry| entry.version);
            if current != *expected {
                return Ok(false);
            }
        }

        state.last_version += 1;
        let version = state.last_version;
        for mutation in mutations {
            match mutation {
                Mutation::Set(key, value) => {
                    state.entries.insert(key, Entry { value, version });
                }
                Mutation::Delete(key) => {
                    state.entries.remove(&key);
                }
            }
        }

        if let Some(path) = &kv.snapshot_path {
            persist(&state, path).await?;
        }
        Ok(true)
    }
}

async fn persist(state: &State, path: &Path) -> KvResult<()> {
    let bytes = bincode::serde::encode_to_vec(state, bincode::config::standard())?;
    // Write-then-rename so a crash mid-write never corrupts the snapshot.
    let staging = path.with_extension("tmp");
    tokio::fs::write(&staging, &bytes).await?;
    tokio::fs::rename(&staging, path).await?;
    log::debug!("persisted kv snapshot ({} entries)", state.entries.len());
    Ok(())
}

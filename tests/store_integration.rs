//! Integration tests for the identity store's optimistic-concurrency
//! guarantees.

use std::sync::Arc;

use chrono::{Duration, Utc};
use lectern::identity::{
    IdentityStore, KvIdentityStore, NewUser, RefreshTokenRecord, Role, StoreError,
};
use lectern::kv::Kv;

fn setup() -> KvIdentityStore {
    KvIdentityStore::new(Kv::in_memory())
}

fn candidate(username: &str, email: &str) -> NewUser {
    NewUser {
        name: format!("User {username}"),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$fake".to_string(),
        role: Role::Instructor,
    }
}

fn record(user_id: &str, token_hash: &str) -> RefreshTokenRecord {
    let issued_at = Utc::now();
    RefreshTokenRecord {
        user_id: user_id.to_string(),
        token_hash: token_hash.to_string(),
        issued_at,
        expires_at: issued_at + Duration::days(30),
    }
}

#[tokio::test]
async fn created_user_is_visible_under_all_three_keys() {
    let store = setup();
    let created = store
        .create_user(candidate("alice", "alice@x.com"))
        .await
        .expect("create should succeed");

    let by_id = store.get_user(&created.id).await.unwrap();
    let by_username = store.get_user("alice").await.unwrap();
    let by_email = store.get_user("alice@x.com").await.unwrap();

    assert_eq!(by_id, created);
    assert_eq!(by_username, created);
    assert_eq!(by_email, created);
}

#[tokio::test]
async fn identifiers_sort_by_creation_order() {
    let store = setup();
    let first = store
        .create_user(candidate("alice", "alice@x.com"))
        .await
        .unwrap();
    // Identifier ordering is only defined across timestamps.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = store
        .create_user(candidate("bob", "bob@x.com"))
        .await
        .unwrap();

    assert!(first.id < second.id, "ids must be monotonically sortable");
}

#[tokio::test]
async fn duplicate_username_rejected() {
    let store = setup();
    store
        .create_user(candidate("alice", "alice@x.com"))
        .await
        .unwrap();

    let result = store.create_user(candidate("alice", "other@x.com")).await;
    assert!(matches!(result, Err(StoreError::DuplicateIdentity)));
}

#[tokio::test]
async fn duplicate_email_rejected() {
    let store = setup();
    store
        .create_user(candidate("alice", "alice@x.com"))
        .await
        .unwrap();

    let result = store.create_user(candidate("mallory", "alice@x.com")).await;
    assert!(matches!(result, Err(StoreError::DuplicateIdentity)));
}

#[tokio::test]
async fn rejected_creation_applies_nothing() {
    let store = setup();
    store
        .create_user(candidate("alice", "alice@x.com"))
        .await
        .unwrap();

    // Loses on the email key; the new username key must not appear.
    let result = store.create_user(candidate("mallory", "alice@x.com")).await;
    assert!(result.is_err());
    assert!(matches!(
        store.get_user("mallory").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn concurrent_creates_have_single_winner() {
    let store = Arc::new(setup());

    let mut handles = Vec::new();
    for i in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_user(candidate("alice", &format!("alice{i}@x.com")))
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("task should not panic") {
            Ok(_) => winners += 1,
            Err(StoreError::DuplicateIdentity) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn list_users_scans_in_key_order() {
    let store = setup();
    store
        .create_user(candidate("bob", "bob@x.com"))
        .await
        .unwrap();
    store
        .create_user(candidate("alice", "alice@x.com"))
        .await
        .unwrap();

    // Two users, three keys each.
    let listed = store.list_users("").await.unwrap();
    assert_eq!(listed.len(), 6);

    let mut usernames: Vec<_> = listed.iter().map(|user| user.username.clone()).collect();
    usernames.dedup();
    assert!(usernames.len() >= 2, "both users must appear in the scan");
}

#[tokio::test]
async fn put_refresh_token_creates_then_replaces() {
    let store = setup();
    store
        .put_refresh_token(&record("user-1", "hash-a"), None)
        .await
        .expect("create should succeed");

    let (stored, _) = store.get_refresh_token("user-1").await.unwrap();
    assert_eq!(stored.token_hash, "hash-a");

    store
        .put_refresh_token(&record("user-1", "hash-b"), None)
        .await
        .expect("replace should succeed");

    let (stored, _) = store.get_refresh_token("user-1").await.unwrap();
    assert_eq!(stored.token_hash, "hash-b");
}

#[tokio::test]
async fn rotation_loser_observes_conflict() {
    let store = setup();
    store
        .put_refresh_token(&record("user-1", "hash-a"), None)
        .await
        .unwrap();

    // Two rotations read the same versionstamp; only one may commit.
    let (_, observed) = store.get_refresh_token("user-1").await.unwrap();
    store
        .put_refresh_token(&record("user-1", "hash-b"), Some(observed))
        .await
        .expect("first rotation should win");

    let loser = store
        .put_refresh_token(&record("user-1", "hash-c"), Some(observed))
        .await;
    assert!(matches!(loser, Err(StoreError::ConcurrencyConflict)));

    let (stored, _) = store.get_refresh_token("user-1").await.unwrap();
    assert_eq!(stored.token_hash, "hash-b");
}

#[tokio::test]
async fn delete_refresh_token_reports_presence() {
    let store = setup();
    assert!(!store.delete_refresh_token("user-1").await.unwrap());

    store
        .put_refresh_token(&record("user-1", "hash-a"), None)
        .await
        .unwrap();
    assert!(store.delete_refresh_token("user-1").await.unwrap());

    assert!(matches!(
        store.get_refresh_token("user-1").await,
        Err(StoreError::NotFound)
    ));
    assert!(!store.delete_refresh_token("user-1").await.unwrap());
}

#[tokio::test]
async fn list_refresh_tokens_covers_namespace() {
    let store = setup();
    store
        .put_refresh_token(&record("user-1", "hash-a"), None)
        .await
        .unwrap();
    store
        .put_refresh_token(&record("user-2", "hash-b"), None)
        .await
        .unwrap();

    let records = store.list_refresh_tokens("").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].user_id, "user-1");
    assert_eq!(records[1].user_id, "user-2");
}

#[tokio::test]
async fn from_config_honors_store_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = lectern::config::AuthConfig::development();
    config.store_path = Some(dir.path().join("kv.db"));

    {
        let store = KvIdentityStore::from_config(&config).await.unwrap();
        store
            .create_user(candidate("alice", "alice@x.com"))
            .await
            .unwrap();
    }

    let reopened = KvIdentityStore::from_config(&config).await.unwrap();
    assert!(reopened.get_user("alice").await.is_ok());

    // Without a path the store starts empty every time.
    let ephemeral = KvIdentityStore::from_config(&lectern::config::AuthConfig::development())
        .await
        .unwrap();
    assert!(matches!(
        ephemeral.get_user("alice").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn store_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.db");

    let created = {
        let store = KvIdentityStore::new(Kv::open(&path).await.unwrap());
        store
            .create_user(candidate("alice", "alice@x.com"))
            .await
            .unwrap()
    };

    let reopened = KvIdentityStore::new(Kv::open(&path).await.unwrap());
    let loaded = reopened.get_user("alice").await.unwrap();
    assert_eq!(loaded, created);
}

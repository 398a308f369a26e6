//! Integration tests for the file-backed token cache store

use std::sync::Arc;

use calmate_core::testing::{ScriptedIdentityProvider, CLIENT_ID, HOME_ACCOUNT_ID, USERNAME};
use calmate_core::TokenCacheStore;
use calmate_infra::auth::FileTokenCacheStore;
use chrono::Utc;
use tempfile::tempdir;

/// Let spawned tasks run until they block.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn saved_cache_is_restored_by_a_fresh_store() {
    let dir = tempdir().expect("temp dir");
    let provider = ScriptedIdentityProvider::new();

    let store = FileTokenCacheStore::new(dir.path());
    let handle = store.load(CLIENT_ID).await.expect("load");
    let token = {
        let mut cache = handle.lock().await;
        provider.seed_account(&mut cache, Utc::now())
    };
    store.save(CLIENT_ID).await;

    assert!(store.cache_path(CLIENT_ID).exists());
    assert!(!handle.lock().await.has_state_changed());

    let reopened = FileTokenCacheStore::new(dir.path());
    let cache = reopened.load(CLIENT_ID).await.expect("reload");
    let cache = cache.lock().await;
    assert_eq!(cache.accounts().len(), 1);
    assert_eq!(cache.accounts()[0].username.as_deref(), Some(USERNAME));
    assert_eq!(cache.access_token(HOME_ACCOUNT_ID), Some(token));
}

#[tokio::test]
async fn load_returns_the_same_handle_per_client() {
    let dir = tempdir().expect("temp dir");
    let store = FileTokenCacheStore::new(dir.path());

    let first = store.load(CLIENT_ID).await.expect("load");
    let second = store.load(CLIENT_ID).await.expect("load");
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let other = store.load("another-client").await.expect("load");
    assert!(!std::sync::Arc::ptr_eq(&first, &other));
}

#[tokio::test]
async fn unchanged_cache_is_not_written() {
    let dir = tempdir().expect("temp dir");
    let store = FileTokenCacheStore::new(dir.path());

    store.load(CLIENT_ID).await.expect("load");
    store.save(CLIENT_ID).await;

    assert!(!store.cache_path(CLIENT_ID).exists());
}

#[tokio::test]
async fn corrupt_file_is_treated_as_empty() {
    let dir = tempdir().expect("temp dir");
    let store = FileTokenCacheStore::new(dir.path());
    std::fs::write(store.cache_path(CLIENT_ID), "{ not json").expect("write");

    let handle = store.load(CLIENT_ID).await.expect("load");
    assert!(handle.lock().await.is_empty());
}

#[tokio::test]
async fn clear_removes_file_and_is_idempotent() {
    let dir = tempdir().expect("temp dir");
    let provider = ScriptedIdentityProvider::new();
    let store = FileTokenCacheStore::new(dir.path());

    let handle = store.load(CLIENT_ID).await.expect("load");
    provider.seed_account(&mut *handle.lock().await, Utc::now());
    store.save(CLIENT_ID).await;

    assert!(store.clear(CLIENT_ID).await.expect("clear"));
    assert!(!store.cache_path(CLIENT_ID).exists());
    assert!(!store.clear(CLIENT_ID).await.expect("second clear"));

    let fresh = store.load(CLIENT_ID).await.expect("load after clear");
    assert!(fresh.lock().await.is_empty());
}

#[tokio::test]
async fn clear_without_any_cache_succeeds() {
    let dir = tempdir().expect("temp dir");
    let store = FileTokenCacheStore::new(dir.path().join("never-created"));

    assert!(!store.clear(CLIENT_ID).await.expect("clear"));
    assert!(!store.cache_path(CLIENT_ID).exists());
}

#[tokio::test]
async fn failed_save_is_swallowed_and_retried_later() {
    let dir = tempdir().expect("temp dir");
    let cache_dir = dir.path().join("cache");

    let provider = ScriptedIdentityProvider::new();
    let store = FileTokenCacheStore::new(&cache_dir);
    let handle = store.load(CLIENT_ID).await.expect("load");
    provider.seed_account(&mut *handle.lock().await, Utc::now());

    // A regular file where the cache directory should be makes the write fail
    std::fs::write(&cache_dir, "").expect("write");
    store.save(CLIENT_ID).await;

    assert!(handle.lock().await.has_state_changed());
    assert_eq!(std::fs::read_to_string(&cache_dir).expect("read"), "");

    std::fs::remove_file(&cache_dir).expect("unblock");
    store.save(CLIENT_ID).await;
    assert!(!handle.lock().await.has_state_changed());
    assert!(store.cache_path(CLIENT_ID).exists());
}

#[tokio::test]
async fn save_waiting_on_the_lock_does_not_outlive_logout() {
    let dir = tempdir().expect("temp dir");
    let provider = ScriptedIdentityProvider::new();
    let store = Arc::new(FileTokenCacheStore::new(dir.path()));

    let handle = store.load(CLIENT_ID).await.expect("load");
    provider.seed_account(&mut *handle.lock().await, Utc::now());
    store.save(CLIENT_ID).await;

    // A refresh is in progress: the cache is locked and modified
    let mut guard = handle.lock().await;
    provider.seed_account(&mut guard, Utc::now());

    let saver = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.save(CLIENT_ID).await }
    });
    settle().await;
    let clearer = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.clear(CLIENT_ID).await }
    });
    settle().await;

    drop(guard);
    saver.await.expect("save task");
    assert!(clearer.await.expect("clear task").expect("clear"));

    assert!(!store.cache_path(CLIENT_ID).exists());
    let reopened = FileTokenCacheStore::new(dir.path());
    let cache = reopened.load(CLIENT_ID).await.expect("reload");
    assert!(cache.lock().await.accounts().is_empty());
}

#[tokio::test]
async fn save_queued_behind_clear_skips_the_write() {
    let dir = tempdir().expect("temp dir");
    let provider = ScriptedIdentityProvider::new();
    let store = Arc::new(FileTokenCacheStore::new(dir.path()));

    let handle = store.load(CLIENT_ID).await.expect("load");
    let mut guard = handle.lock().await;
    provider.seed_account(&mut guard, Utc::now());

    let clearer = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.clear(CLIENT_ID).await }
    });
    settle().await;
    let saver = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.save(CLIENT_ID).await }
    });
    settle().await;

    drop(guard);
    assert!(!clearer.await.expect("clear task").expect("clear"));
    saver.await.expect("save task");

    assert!(!store.cache_path(CLIENT_ID).exists());
    assert!(handle.lock().await.has_state_changed());
}

#[tokio::test]
async fn undeletable_cache_file_does_not_fail_clear() {
    let dir = tempdir().expect("temp dir");
    let store = FileTokenCacheStore::new(dir.path());

    // A non-empty directory at the cache path cannot be unlinked
    let blocker = store.cache_path(CLIENT_ID);
    std::fs::create_dir(&blocker).expect("mkdir");
    std::fs::write(blocker.join("keep"), "x").expect("write");

    assert!(!store.clear(CLIENT_ID).await.expect("clear"));
    assert!(blocker.is_dir());
}

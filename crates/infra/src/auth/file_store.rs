//! File-backed token cache store
//!
//! One JSON file per client id, `token_cache_<prefix>.json`, where the prefix
//! is the first eight characters of the client id with anything outside
//! `[A-Za-z0-9-]` replaced by `_`. Writes go through a temp file in the same
//! directory and are renamed over the target, on the blocking pool.
//!
//! `save` and `clear` both take the per-client mutex, and a save that finds
//! its handle no longer registered writes nothing, so a logout is never undone
//! by a save that was already waiting.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use calmate_core::{SharedTokenCache, TokenCache, TokenCacheStore};
use calmate_domain::constants::CACHE_FILE_PREFIX;
use calmate_domain::{client_id_prefix, CalmateError, Result};
use dashmap::DashMap;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::InfraError;

/// Token caches persisted under a directory
pub struct FileTokenCacheStore {
    directory: PathBuf,
    handles: DashMap<String, SharedTokenCache>,
}

impl FileTokenCacheStore {
    /// Store rooted at `directory`; the directory is created on first save.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), handles: DashMap::new() }
    }

    /// Directory holding the cache files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Location of the cache file for `client_id`.
    pub fn cache_path(&self, client_id: &str) -> PathBuf {
        self.directory.join(cache_file_name(client_id))
    }

    async fn read_cache(&self, client_id: &str) -> Result<TokenCache> {
        let path = self.cache_path(client_id);
        let blob = match tokio::fs::read_to_string(&path).await {
            Ok(blob) => blob,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no token cache on disk");
                return Ok(TokenCache::new());
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        match TokenCache::from_json(&blob) {
            Ok(cache) => Ok(cache),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "token cache is unreadable; starting from an empty cache"
                );
                Ok(TokenCache::new())
            }
        }
    }

    /// Whether `handle` is still the live handle for `client_id`.
    fn is_current(&self, client_id: &str, handle: &SharedTokenCache) -> bool {
        self.handles.get(client_id).is_some_and(|live| Arc::ptr_eq(live.value(), handle))
    }
}

/// Stage `blob` in a temp file next to `path`, then rename it over `path`.
fn write_atomically(directory: &Path, path: &Path, blob: &str) -> Result<()> {
    std::fs::create_dir_all(directory).map_err(InfraError::from)?;
    let mut staged = NamedTempFile::new_in(directory).map_err(InfraError::from)?;
    staged.write_all(blob.as_bytes()).map_err(InfraError::from)?;
    staged.as_file().sync_all().map_err(InfraError::from)?;
    staged.persist(path).map_err(|err| InfraError::from(err.error))?;
    Ok(())
}

/// `token_cache_<sanitized prefix>.json`
pub fn cache_file_name(client_id: &str) -> String {
    let prefix: String = client_id_prefix(client_id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{CACHE_FILE_PREFIX}{prefix}.json")
}

#[async_trait]
impl TokenCacheStore for FileTokenCacheStore {
    async fn load(&self, client_id: &str) -> Result<SharedTokenCache> {
        if let Some(handle) = self.handles.get(client_id) {
            return Ok(Arc::clone(handle.value()));
        }

        let cache = self.read_cache(client_id).await?;
        // Another task may have loaded it meanwhile; first insert wins.
        let handle = self
            .handles
            .entry(client_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(cache)))
            .value()
            .clone();
        Ok(handle)
    }

    async fn save(&self, client_id: &str) {
        let Some(handle) = self.handles.get(client_id).map(|h| Arc::clone(h.value())) else {
            return;
        };

        let mut cache = handle.lock().await;
        // Cleared (or replaced) while we waited for the lock
        if !self.is_current(client_id, &handle) {
            debug!(
                client_id_prefix = client_id_prefix(client_id),
                "token cache cleared before save; skipping write"
            );
            return;
        }
        if !cache.has_state_changed() {
            return;
        }

        let path = self.cache_path(client_id);
        let written = match cache.to_json() {
            Ok(blob) => {
                let directory = self.directory.clone();
                let target = path.clone();
                tokio::task::spawn_blocking(move || write_atomically(&directory, &target, &blob))
                    .await
                    .unwrap_or_else(|err| {
                        Err(CalmateError::Internal(format!("cache write task failed: {err}")))
                    })
            }
            Err(err) => Err(err),
        };
        match written {
            Ok(()) => {
                cache.mark_persisted();
                debug!(path = %path.display(), "token cache saved");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to save token cache");
            }
        }
    }

    async fn clear(&self, client_id: &str) -> Result<bool> {
        // Hold the handle's lock so an in-flight save cannot write it back.
        let existing = self.handles.get(client_id).map(|h| Arc::clone(h.value()));
        let _guard = match &existing {
            Some(handle) => Some(handle.lock().await),
            None => None,
        };
        self.handles.remove(client_id);

        let path = self.cache_path(client_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(client_id_prefix = client_id_prefix(client_id), "token cache cleared");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to delete token cache file");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_sanitized_prefix() {
        assert_eq!(
            cache_file_name("1a2b3c4d-5e6f-7a8b-9c0d"),
            "token_cache_1a2b3c4d.json"
        );
        assert_eq!(cache_file_name("ab/c.d"), "token_cache_ab_c_d.json");
        assert_eq!(cache_file_name("12-45 78xyz"), "token_cache_12-45_78.json");
    }
}

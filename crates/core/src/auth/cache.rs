//! Serializable token cache
//!
//! Holds the accounts and tokens for one client id. Stores persist it as an
//! opaque JSON blob via [`TokenCache::to_json`] / [`TokenCache::from_json`]
//! and never inspect the contents themselves.

use std::fmt;
use std::sync::Arc;

use calmate_domain::{AccessToken, CachedAccount, CalmateError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Cache handle shared between the store and the state machine; the mutex
/// serializes read-modify-write per client id.
pub type SharedTokenCache = Arc<Mutex<TokenCache>>;

const CACHE_FORMAT_VERSION: u32 = 1;

/// Tokens returned by a successful grant
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub scope: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AccessTokenRecord {
    home_account_id: String,
    secret: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    scopes: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RefreshTokenRecord {
    home_account_id: String,
    secret: String,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CacheContents {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    accounts: Vec<CachedAccount>,
    #[serde(default)]
    access_tokens: Vec<AccessTokenRecord>,
    #[serde(default)]
    refresh_tokens: Vec<RefreshTokenRecord>,
}

/// In-memory token cache with change tracking
#[derive(Clone, Default)]
pub struct TokenCache {
    contents: CacheContents,
    state_changed: bool,
}

impl TokenCache {
    /// Empty cache, unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a cache from its serialized form; the result reports no
    /// pending changes.
    pub fn from_json(blob: &str) -> Result<Self> {
        let contents: CacheContents = serde_json::from_str(blob)
            .map_err(|e| CalmateError::Storage(format!("Failed to parse token cache: {e}")))?;
        Ok(Self { contents, state_changed: false })
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> Result<String> {
        let mut contents = self.contents.clone();
        contents.version = CACHE_FORMAT_VERSION;
        serde_json::to_string_pretty(&contents)
            .map_err(|e| CalmateError::Storage(format!("Failed to serialize token cache: {e}")))
    }

    /// True when the cache was mutated since it was loaded or last persisted.
    pub fn has_state_changed(&self) -> bool {
        self.state_changed
    }

    /// Record that the current state has been stored.
    pub fn mark_persisted(&mut self) {
        self.state_changed = false;
    }

    /// Whether no account is cached.
    pub fn is_empty(&self) -> bool {
        self.contents.accounts.is_empty()
    }

    /// Accounts in the order they were first signed in.
    pub fn accounts(&self) -> &[CachedAccount] {
        &self.contents.accounts
    }

    /// Cached access token for an account, if any (expired or not).
    pub fn access_token(&self, home_account_id: &str) -> Option<AccessToken> {
        let record =
            self.contents.access_tokens.iter().find(|r| r.home_account_id == home_account_id)?;
        let username = self
            .contents
            .accounts
            .iter()
            .find(|a| a.home_account_id == home_account_id)
            .and_then(|a| a.username.clone());
        Some(AccessToken::new(record.secret.clone(), record.expires_at, username))
    }

    /// Refresh token stored for the account, if any.
    pub fn refresh_token(&self, home_account_id: &str) -> Option<&str> {
        self.contents
            .refresh_tokens
            .iter()
            .find(|r| r.home_account_id == home_account_id)
            .map(|r| r.secret.as_str())
    }

    /// Record a successful grant for `account` and return the new access
    /// token. An existing account keeps its position; a missing refresh
    /// token in the grant keeps the previous one.
    pub fn store_grant(
        &mut self,
        account: CachedAccount,
        grant: &TokenGrant,
        now: DateTime<Utc>,
    ) -> AccessToken {
        let home_account_id = account.home_account_id.clone();
        let username = account.username.clone();

        match self.contents.accounts.iter_mut().find(|a| a.home_account_id == home_account_id) {
            Some(existing) => *existing = account,
            None => self.contents.accounts.push(account),
        }

        let expires_in = i64::try_from(grant.expires_in).unwrap_or(i64::from(u32::MAX));
        let expires_at = now + Duration::seconds(expires_in);
        self.contents.access_tokens.retain(|r| r.home_account_id != home_account_id);
        self.contents.access_tokens.push(AccessTokenRecord {
            home_account_id: home_account_id.clone(),
            secret: grant.access_token.clone(),
            expires_at,
            scopes: grant
                .scope
                .as_deref()
                .map(|s| s.split_whitespace().map(ToString::to_string).collect())
                .unwrap_or_default(),
        });

        if let Some(refresh) = &grant.refresh_token {
            self.contents.refresh_tokens.retain(|r| r.home_account_id != home_account_id);
            self.contents.refresh_tokens.push(RefreshTokenRecord {
                home_account_id,
                secret: refresh.clone(),
            });
        }

        self.state_changed = true;
        AccessToken::new(grant.access_token.clone(), expires_at, username)
    }

    /// Forget a refresh token the provider rejected.
    pub fn drop_refresh_token(&mut self, home_account_id: &str) {
        let before = self.contents.refresh_tokens.len();
        self.contents.refresh_tokens.retain(|r| r.home_account_id != home_account_id);
        if self.contents.refresh_tokens.len() != before {
            self.state_changed = true;
        }
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("accounts", &self.contents.accounts)
            .field("access_tokens", &self.contents.access_tokens.len())
            .field("refresh_tokens", &self.contents.refresh_tokens.len())
            .field("state_changed", &self.state_changed)
            .finish()
    }
}

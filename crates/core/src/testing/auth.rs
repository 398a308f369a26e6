//! In-memory doubles for the authentication ports

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calmate_domain::{
    AccessToken, CachedAccount, CalmateError, CredentialPair, DeviceFlowState, Result,
};
use chrono::{DateTime, Utc};

use crate::auth::cache::{SharedTokenCache, TokenCache, TokenGrant};
use crate::auth::ports::{DeviceAuthorization, DevicePoll, IdentityProvider, TokenCacheStore};

/// Client id the doubles are configured for
pub const CLIENT_ID: &str = "00000000-aaaa-bbbb-cccc-000000000001";
/// Username of the seeded account
pub const USERNAME: &str = "ada@contoso.com";
/// Home account id of the seeded account
pub const HOME_ACCOUNT_ID: &str = "oid-1.tid-1";

fn test_account() -> CachedAccount {
    CachedAccount {
        home_account_id: HOME_ACCOUNT_ID.to_string(),
        username: Some(USERNAME.to_string()),
        tenant_id: Some("tid-1".to_string()),
    }
}

fn test_grant(n: usize) -> TokenGrant {
    TokenGrant {
        access_token: format!("access-token-{n}"),
        refresh_token: Some(format!("refresh-token-{n}")),
        expires_in: 3600,
        scope: Some("Calendars.ReadWrite User.Read".to_string()),
    }
}

enum ScriptedPoll {
    Outcome(DevicePoll),
    Authorize,
    Fail(CalmateError),
}

#[derive(Default)]
struct ProviderState {
    initiate_calls: usize,
    silent_calls: usize,
    grants: usize,
    polls: VecDeque<ScriptedPoll>,
    poll_times: Vec<DateTime<Utc>>,
    initiation_error: Option<CalmateError>,
}

/// Identity provider driven by a script of poll results.
///
/// Silent acquisition returns the cached access token while it is valid.
/// Polls with nothing scripted report `Pending`.
#[derive(Default)]
pub struct ScriptedIdentityProvider {
    state: Mutex<ProviderState>,
}

impl ScriptedIdentityProvider {
    /// Provider with nothing scripted; polls answer pending.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        // Test utility: panic on poisoned mutex to fail tests early
        self.state.lock().expect("mutex poisoned")
    }

    /// Put a signed-in account with a valid access token into `cache`.
    pub fn seed_account(&self, cache: &mut TokenCache, now: DateTime<Utc>) -> AccessToken {
        let n = {
            let mut state = self.state();
            state.grants += 1;
            state.grants
        };
        cache.store_grant(test_account(), &test_grant(n), now)
    }

    /// Queue the result of the next poll.
    pub fn push_poll(&self, poll: DevicePoll) {
        self.state().polls.push_back(ScriptedPoll::Outcome(poll));
    }

    /// Next poll succeeds and records a grant in the cache.
    pub fn push_authorized_poll(&self) {
        self.state().polls.push_back(ScriptedPoll::Authorize);
    }

    /// Queue a failing poll.
    pub fn push_poll_error(&self, error: CalmateError) {
        self.state().polls.push_back(ScriptedPoll::Fail(error));
    }

    /// Make the next device-code request fail.
    pub fn fail_initiation(&self, error: CalmateError) {
        self.state().initiation_error = Some(error);
    }

    /// Device-code requests made so far.
    pub fn initiate_calls(&self) -> usize {
        self.state().initiate_calls
    }

    /// Silent acquisitions attempted so far.
    pub fn silent_calls(&self) -> usize {
        self.state().silent_calls
    }

    /// Times at which the provider was polled, as stamped on the flow.
    pub fn poll_times(&self) -> Vec<DateTime<Utc>> {
        self.state().poll_times.clone()
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentityProvider {
    async fn acquire_token_silent(
        &self,
        _credentials: &CredentialPair,
        _scopes: &[String],
        account: &CachedAccount,
        cache: &mut TokenCache,
    ) -> Result<Option<AccessToken>> {
        self.state().silent_calls += 1;
        Ok(cache
            .access_token(&account.home_account_id)
            .filter(|token| !token.expires_within(Utc::now(), 300)))
    }

    async fn initiate_device_flow(
        &self,
        _credentials: &CredentialPair,
        _scopes: &[String],
    ) -> Result<DeviceAuthorization> {
        let mut state = self.state();
        if let Some(error) = state.initiation_error.take() {
            return Err(error);
        }
        state.initiate_calls += 1;
        Ok(DeviceAuthorization {
            device_code: format!("device-code-{}", state.initiate_calls),
            user_code: "ABCD-1234".to_string(),
            verification_uri: "https://microsoft.com/devicelogin".to_string(),
            message: None,
            interval_secs: 5,
            expires_in_secs: 900,
        })
    }

    async fn poll_device_flow(
        &self,
        flow: &DeviceFlowState,
        cache: &mut TokenCache,
    ) -> Result<DevicePoll> {
        let next = {
            let mut state = self.state();
            state.poll_times.push(flow.last_polled_at.unwrap_or(flow.issued_at));
            state.polls.pop_front()
        };

        match next {
            None => Ok(DevicePoll::Pending),
            Some(ScriptedPoll::Outcome(poll)) => Ok(poll),
            Some(ScriptedPoll::Fail(error)) => Err(error),
            Some(ScriptedPoll::Authorize) => Ok(DevicePoll::Authorized(self.seed_account(cache, Utc::now()))),
        }
    }
}

#[derive(Default)]
struct StoreState {
    handles: HashMap<String, SharedTokenCache>,
    persisted: HashMap<String, String>,
    saves: HashMap<String, usize>,
    clear_failure: Option<CalmateError>,
}

/// Token cache store keeping serialized blobs in memory
#[derive(Default)]
pub struct InMemoryTokenCacheStore {
    state: Mutex<StoreState>,
}

impl InMemoryTokenCacheStore {
    /// Store with nothing persisted.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("mutex poisoned")
    }

    /// Number of saves that actually wrote state.
    pub fn save_count(&self, client_id: &str) -> usize {
        self.state().saves.get(client_id).copied().unwrap_or(0)
    }

    /// Stored blob for `client_id`, if any.
    pub fn persisted(&self, client_id: &str) -> Option<String> {
        self.state().persisted.get(client_id).cloned()
    }

    /// Make the next `clear` fail without touching stored state.
    pub fn fail_next_clear(&self, error: CalmateError) {
        self.state().clear_failure = Some(error);
    }
}

#[async_trait]
impl TokenCacheStore for InMemoryTokenCacheStore {
    async fn load(&self, client_id: &str) -> Result<SharedTokenCache> {
        let mut state = self.state();
        if let Some(handle) = state.handles.get(client_id) {
            return Ok(handle.clone());
        }
        let cache = match state.persisted.get(client_id) {
            Some(blob) => TokenCache::from_json(blob)?,
            None => TokenCache::new(),
        };
        let handle = Arc::new(tokio::sync::Mutex::new(cache));
        state.handles.insert(client_id.to_string(), handle.clone());
        Ok(handle)
    }

    async fn save(&self, client_id: &str) {
        let Some(handle) = self.state().handles.get(client_id).cloned() else {
            return;
        };
        let mut cache = handle.lock().await;
        if !cache.has_state_changed() {
            return;
        }
        if let Ok(blob) = cache.to_json() {
            cache.mark_persisted();
            let mut state = self.state();
            state.persisted.insert(client_id.to_string(), blob);
            *state.saves.entry(client_id.to_string()).or_default() += 1;
        }
    }

    async fn clear(&self, client_id: &str) -> Result<bool> {
        let mut state = self.state();
        if let Some(error) = state.clear_failure.take() {
            return Err(error);
        }
        state.handles.remove(client_id);
        Ok(state.persisted.remove(client_id).is_some())
    }
}

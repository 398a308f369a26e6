//! Authentication state machine
//!
//! `NO_SESSION -> SILENT_ATTEMPT -> {AUTHENTICATED | FLOW_PENDING}`, then on
//! later calls `POLLING -> {AUTHENTICATED | EXPIRED | DENIED}`.
//!
//! Every call runs to completion or to a pending/expired/denied outcome. The
//! caller keeps the [`AuthSession`] between calls and re-invokes
//! [`AuthService::get_access_token`] to resume a pending device-code flow.

use std::sync::Arc;
use std::time::Duration;

use calmate_domain::constants::{DEFAULT_MAX_POLL_WAIT_SECS, DEFAULT_SCOPES, SLOW_DOWN_INCREMENT_SECS};
use calmate_domain::{
    AccessToken, AuthOutcome, CachedAccount, CredentialPair, DeviceFlowState, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cache::TokenCache;
use super::credentials::CredentialResolver;
use super::ports::{DevicePoll, IdentityProvider, TokenCacheStore};
use crate::clock::Clock;

/// Session-scoped authentication state.
///
/// Holds at most one pending device-code flow. Serializable so callers can
/// keep it in whatever session storage they have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(default)]
    pending_flow: Option<DeviceFlowState>,
}

impl AuthSession {
    /// Session with no pending flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Device-code flow awaiting the user, if any.
    pub fn pending_flow(&self) -> Option<&DeviceFlowState> {
        self.pending_flow.as_ref()
    }

    /// Whether a device-code flow awaits the user.
    pub fn has_pending_flow(&self) -> bool {
        self.pending_flow.is_some()
    }

    /// Drop the pending flow, returning it.
    pub fn discard_pending_flow(&mut self) -> Option<DeviceFlowState> {
        self.pending_flow.take()
    }
}

/// Parameters of one token request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    /// Skip silent reuse and start a fresh device-code flow.
    pub force_new_login: bool,
}

impl TokenRequest {
    /// Request using the resolved credentials and silent reuse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit client id; wins over every other source.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Explicit tenant id; wins over every other source.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Skip silent reuse and start a fresh device-code flow.
    pub fn force_new_login(mut self) -> Self {
        self.force_new_login = true;
        self
    }
}

/// Authentication service driving the device-code state machine
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    cache_store: Arc<dyn TokenCacheStore>,
    resolver: CredentialResolver,
    clock: Arc<dyn Clock>,
    scopes: Vec<String>,
    max_poll_wait: Duration,
}

impl AuthService {
    /// Service with the default scopes and poll wait.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        cache_store: Arc<dyn TokenCacheStore>,
        resolver: CredentialResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            cache_store,
            resolver,
            clock,
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            max_poll_wait: Duration::from_secs(DEFAULT_MAX_POLL_WAIT_SECS),
        }
    }

    /// Scopes requested from the identity provider.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Longest sleep inserted before a poll to honour the provider interval
    pub fn with_max_poll_wait(mut self, max_poll_wait: Duration) -> Self {
        self.max_poll_wait = max_poll_wait;
        self
    }

    /// Obtain an access token, starting or resuming a device-code flow as
    /// needed.
    ///
    /// `Err` is reserved for real failures (configuration, unsupported
    /// flow, transport, storage); pending/expired/denied are outcomes.
    pub async fn get_access_token(
        &self,
        session: &mut AuthSession,
        request: &TokenRequest,
    ) -> Result<AuthOutcome> {
        let credentials =
            self.resolver.resolve(request.client_id.as_deref(), request.tenant_id.as_deref())?;

        if session.pending_flow.as_ref().is_some_and(|flow| flow.credentials != credentials) {
            info!(
                client_id_prefix = credentials.client_id_prefix(),
                "Discarding pending device flow started for different credentials"
            );
            session.pending_flow = None;
        }

        let flow_forced = session.pending_flow.as_ref().is_some_and(|flow| flow.force_new_login);
        if !request.force_new_login && !flow_forced {
            if let Some(token) = self.try_silent(&credentials).await? {
                if session.pending_flow.take().is_some() {
                    debug!("Silent session found; dropping pending device flow");
                }
                return Ok(AuthOutcome::Authenticated(token));
            }
        }

        if request.force_new_login {
            if session.pending_flow.take().is_some() {
                info!("Forced login discards the pending device flow");
            }
            return self.start_flow(session, credentials, true).await;
        }

        match session.pending_flow.take() {
            None => self.start_flow(session, credentials, false).await,
            Some(flow) => self.poll_flow(session, flow).await,
        }
    }

    /// Clear the stored cache for the effective client id and any pending
    /// flow. Idempotent.
    ///
    /// A failure to delete stored state is logged and still reported as a
    /// successful logout.
    pub async fn logout(&self, session: &mut AuthSession, client_id: Option<&str>) -> Result<bool> {
        let client_id = self.resolver.resolve_client_id(client_id)?;
        if session.discard_pending_flow().is_some() {
            debug!("Logout discards the pending device flow");
        }
        let removed = match self.cache_store.clear(&client_id).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(
                    client_id_prefix = calmate_domain::client_id_prefix(&client_id),
                    error = %err,
                    "Failed to clear token cache during logout"
                );
                false
            }
        };
        info!(
            client_id_prefix = calmate_domain::client_id_prefix(&client_id),
            removed, "Logged out"
        );
        Ok(true)
    }

    /// Accounts currently cached for the effective client id.
    pub async fn cached_accounts(&self, client_id: Option<&str>) -> Result<Vec<CachedAccount>> {
        let client_id = self.resolver.resolve_client_id(client_id)?;
        let cache = self.cache_store.load(&client_id).await?;
        let guard = cache.lock().await;
        Ok(guard.accounts().to_vec())
    }

    async fn try_silent(&self, credentials: &CredentialPair) -> Result<Option<AccessToken>> {
        let handle = self.cache_store.load(&credentials.client_id).await?;
        let token = {
            let mut cache = handle.lock().await;
            let Some(account) = cache.accounts().first().cloned() else {
                debug!(client_id_prefix = credentials.client_id_prefix(), "No cached accounts");
                return Ok(None);
            };
            self.silent_for(credentials, &account, &mut cache).await
        };

        if token.is_some() {
            self.cache_store.save(&credentials.client_id).await;
        }
        Ok(token)
    }

    async fn silent_for(
        &self,
        credentials: &CredentialPair,
        account: &CachedAccount,
        cache: &mut TokenCache,
    ) -> Option<AccessToken> {
        match self.provider.acquire_token_silent(credentials, &self.scopes, account, cache).await {
            Ok(Some(token)) => {
                debug!(username = ?account.username, "Silent token acquisition succeeded");
                Some(token)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "Silent token acquisition failed; falling back to device flow");
                None
            }
        }
    }

    async fn start_flow(
        &self,
        session: &mut AuthSession,
        credentials: CredentialPair,
        force_new_login: bool,
    ) -> Result<AuthOutcome> {
        let authorization = self.provider.initiate_device_flow(&credentials, &self.scopes).await?;

        let flow = DeviceFlowState {
            credentials,
            verification_uri: authorization.verification_uri,
            user_code: authorization.user_code,
            device_code: authorization.device_code,
            message: authorization.message,
            interval_secs: authorization.interval_secs,
            expires_in_secs: authorization.expires_in_secs,
            issued_at: self.clock.now(),
            last_polled_at: None,
            force_new_login,
        };
        info!(
            client_id_prefix = flow.credentials.client_id_prefix(),
            interval_secs = flow.interval_secs,
            expires_in_secs = flow.expires_in_secs,
            "Device code flow started"
        );

        let prompt = flow.prompt();
        session.pending_flow = Some(flow);
        Ok(AuthOutcome::Pending(prompt))
    }

    async fn poll_flow(
        &self,
        session: &mut AuthSession,
        mut flow: DeviceFlowState,
    ) -> Result<AuthOutcome> {
        if flow.is_expired(self.clock.now()) {
            info!("Pending device flow expired");
            return Ok(AuthOutcome::Expired);
        }

        let now = self.clock.now();
        let next_poll = flow.next_poll_at();
        if now < next_poll {
            let wait = (next_poll - now).to_std().unwrap_or_default();
            if wait > self.max_poll_wait {
                debug!(wait_ms = wait.as_millis(), "Poll interval not reached; not polling yet");
                let prompt = flow.prompt();
                session.pending_flow = Some(flow);
                return Ok(AuthOutcome::Pending(prompt));
            }
            debug!(wait_ms = wait.as_millis(), "Waiting for provider poll interval");
            self.clock.sleep(wait).await;

            if flow.is_expired(self.clock.now()) {
                info!("Pending device flow expired while waiting to poll");
                return Ok(AuthOutcome::Expired);
            }
        }

        flow.last_polled_at = Some(self.clock.now());
        let client_id = flow.credentials.client_id.clone();
        let handle = self.cache_store.load(&client_id).await?;
        let poll = {
            let mut cache = handle.lock().await;
            self.provider.poll_device_flow(&flow, &mut cache).await
        };

        let poll = match poll {
            Ok(poll) => poll,
            Err(err) => {
                // Keep the flow so the next call can poll again.
                session.pending_flow = Some(flow);
                return Err(err);
            }
        };

        match poll {
            DevicePoll::Authorized(token) => {
                info!(username = ?token.username(), "Device code flow completed");
                self.cache_store.save(&client_id).await;
                Ok(AuthOutcome::Authenticated(token))
            }
            DevicePoll::Pending => {
                let prompt = flow.prompt();
                session.pending_flow = Some(flow);
                Ok(AuthOutcome::Pending(prompt))
            }
            DevicePoll::SlowDown => {
                flow.interval_secs += SLOW_DOWN_INCREMENT_SECS;
                debug!(interval_secs = flow.interval_secs, "Provider requested slower polling");
                let prompt = flow.prompt();
                session.pending_flow = Some(flow);
                Ok(AuthOutcome::Pending(prompt))
            }
            DevicePoll::Denied(reason) => {
                warn!(reason = %reason, "Device code flow denied");
                Ok(AuthOutcome::Denied(reason))
            }
            DevicePoll::Expired => {
                info!("Provider reported the device code expired");
                Ok(AuthOutcome::Expired)
            }
        }
    }
}

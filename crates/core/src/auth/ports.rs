//! Authentication port interfaces

use async_trait::async_trait;
use calmate_domain::{AccessToken, CachedAccount, CredentialPair, DeviceFlowState, Result};

use super::cache::{SharedTokenCache, TokenCache};

/// Device authorization issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub message: Option<String>,
    pub interval_secs: u64,
    pub expires_in_secs: u64,
}

/// Result of a single device-flow poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePoll {
    Authorized(AccessToken),
    /// User has not finished signing in yet.
    Pending,
    /// Provider asked for a longer polling interval.
    SlowDown,
    Denied(String),
    Expired,
}

/// OAuth identity provider (device-code and refresh grants)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Reuse or refresh the cached session for `account`.
    ///
    /// `Ok(None)` means there is no usable session and interaction is needed.
    async fn acquire_token_silent(
        &self,
        credentials: &CredentialPair,
        scopes: &[String],
        account: &CachedAccount,
        cache: &mut TokenCache,
    ) -> Result<Option<AccessToken>>;

    /// Start a device-code flow.
    ///
    /// Fails with `DeviceFlowUnsupported` when the response carries no
    /// device code.
    async fn initiate_device_flow(
        &self,
        credentials: &CredentialPair,
        scopes: &[String],
    ) -> Result<DeviceAuthorization>;

    /// Poll the token endpoint once; on success the grant is recorded in
    /// `cache`.
    async fn poll_device_flow(
        &self,
        flow: &DeviceFlowState,
        cache: &mut TokenCache,
    ) -> Result<DevicePoll>;
}

/// Persistence for one token cache per client id
#[async_trait]
pub trait TokenCacheStore: Send + Sync {
    /// Return the in-memory handle, reading it from storage on first use.
    async fn load(&self, client_id: &str) -> Result<SharedTokenCache>;

    /// Persist the handle if it changed. Best-effort: failures are logged,
    /// never returned.
    async fn save(&self, client_id: &str);

    /// Drop the handle and delete stored state. Returns whether anything was
    /// stored; clearing twice is not an error. Waits for a save in progress
    /// and must not let a save queued behind it write the cache back.
    async fn clear(&self, client_id: &str) -> Result<bool>;
}

/// Read-only lookup of externally stored credentials
pub trait SecretSource: Send + Sync {
    /// Name used in logs, e.g. `"secrets-file"`
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;
}

//! Authentication types
//!
//! Credential pairs, access tokens and the resumable device-code flow state.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DEVICE_FLOW_EXPIRY_SECS;
use crate::errors::CalmateError;

/// Identifies which application registration and directory a token request
/// targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialPair {
    pub client_id: String,
    pub tenant_id: String,
}

impl CredentialPair {
    /// Pair from raw values.
    pub fn new(client_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), tenant_id: tenant_id.into() }
    }

    /// Authority URL for this tenant, e.g.
    /// `https://login.microsoftonline.com/common`.
    pub fn authority(&self, authority_base: &str) -> String {
        format!("{}/{}", authority_base.trim_end_matches('/'), self.tenant_id)
    }

    /// Short client id prefix that is safe to log.
    pub fn client_id_prefix(&self) -> &str {
        client_id_prefix(&self.client_id)
    }
}

/// First eight characters of a client id, on a char boundary.
pub fn client_id_prefix(client_id: &str) -> &str {
    match client_id.char_indices().nth(8) {
        Some((idx, _)) => &client_id[..idx],
        None => client_id,
    }
}

/// Bearer token for the calendar API
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
    username: Option<String>,
}

impl AccessToken {
    /// Token valid until `expires_at`.
    pub fn new(
        secret: impl Into<String>,
        expires_at: DateTime<Utc>,
        username: Option<String>,
    ) -> Self {
        Self { secret: secret.into(), expires_at, username }
    }

    /// Bearer value for the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Instant the provider stops accepting the token.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Signed-in user principal name, when the provider reported one
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// True if the token expires within `threshold_secs` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, threshold_secs: i64) -> bool {
        self.expires_at <= now + Duration::seconds(threshold_secs)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("username", &self.username)
            .finish()
    }
}

/// Account recorded in the token cache after a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    /// `<oid>.<tid>` from the id_token
    pub home_account_id: String,
    pub username: Option<String>,
    pub tenant_id: Option<String>,
}

/// What the user needs to complete a device-code sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePrompt {
    pub verification_uri: String,
    pub user_code: String,
    /// Provider-formatted instructions
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// A device-code flow that has been started but not yet resolved.
///
/// Owned by the caller's session and carried between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlowState {
    pub credentials: CredentialPair,
    pub verification_uri: String,
    pub user_code: String,
    pub device_code: String,
    #[serde(default)]
    pub message: Option<String>,
    pub interval_secs: u64,
    #[serde(default = "default_expiry")]
    pub expires_in_secs: u64,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Started by an explicit re-login; silent reuse stays disabled.
    #[serde(default)]
    pub force_new_login: bool,
}

fn default_expiry() -> u64 {
    DEFAULT_DEVICE_FLOW_EXPIRY_SECS
}

impl DeviceFlowState {
    /// Issue time plus the declared expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + secs(self.expires_in_secs)
    }

    /// Expired once the flow age exceeds the declared expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Earliest instant the provider may be polled again.
    pub fn next_poll_at(&self) -> DateTime<Utc> {
        self.last_polled_at.unwrap_or(self.issued_at) + secs(self.interval_secs)
    }

    /// What the user needs to complete the flow.
    pub fn prompt(&self) -> DevicePrompt {
        let message = self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {} to authenticate.",
                self.verification_uri, self.user_code
            )
        });
        DevicePrompt {
            verification_uri: self.verification_uri.clone(),
            user_code: self.user_code.clone(),
            message,
            expires_at: self.expires_at(),
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::from(u32::try_from(value).unwrap_or(u32::MAX)))
}

/// Result of one `get_access_token` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(AccessToken),
    /// A device-code flow is waiting for the user; present the prompt and
    /// call again later.
    Pending(DevicePrompt),
    /// The pending flow expired; the next call starts a new one.
    Expired,
    /// The user or provider declined the sign-in.
    Denied(String),
}

impl AuthOutcome {
    /// Whether a token was obtained.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Collapse non-authenticated outcomes into their error variants.
    pub fn into_token(self) -> Result<AccessToken, CalmateError> {
        match self {
            Self::Authenticated(token) => Ok(token),
            Self::Pending(prompt) => Err(CalmateError::AuthenticationPending(prompt.message)),
            Self::Expired => Err(CalmateError::AuthenticationExpired(
                "device code expired before sign-in completed".to_string(),
            )),
            Self::Denied(reason) => Err(CalmateError::AuthenticationDenied(reason)),
        }
    }
}

//! Microsoft identity platform provider
//!
//! Speaks the OAuth 2.0 device authorization grant and the refresh-token
//! grant against `{authority_base}/{tenant}/oauth2/v2.0/{devicecode,token}`.
//! Account identity comes from the unverified `id_token` claims; the token is
//! only used to label the cache entry, never to authorize anything.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use calmate_core::{
    Clock, DeviceAuthorization, DevicePoll, IdentityProvider, SystemClock, TokenCache, TokenGrant,
};
use calmate_domain::constants::{
    DEFAULT_AUTHORITY_BASE, DEFAULT_DEVICE_FLOW_EXPIRY_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEVICE_CODE_GRANT_TYPE, RESERVED_SCOPES, TOKEN_REFRESH_THRESHOLD_SECS,
};
use calmate_domain::{
    AccessToken, CachedAccount, CalmateError, CredentialPair, DeviceFlowState, Result,
};
use reqwest::{Method, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http::{remote_api_error, HttpClient};

/// Device-code and refresh grants against the Microsoft identity platform
pub struct MicrosoftIdentityProvider {
    http: HttpClient,
    authority_base: String,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: Option<String>,
    user_code: Option<String>,
    verification_uri: Option<String>,
    expires_in: Option<u64>,
    interval: Option<u64>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    scope: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    oid: Option<String>,
    sub: Option<String>,
    tid: Option<String>,
    preferred_username: Option<String>,
}

/// Either a grant or the OAuth error the token endpoint returned
enum TokenEndpointReply {
    Granted(TokenResponse),
    Rejected(OAuthErrorResponse),
}

impl MicrosoftIdentityProvider {
    /// Provider against the public Microsoft authority.
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            authority_base: DEFAULT_AUTHORITY_BASE.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Authority base URL, without tenant.
    pub fn with_authority_base(mut self, authority_base: impl Into<String>) -> Self {
        self.authority_base = authority_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Clock used to stamp issued tokens.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn endpoint(&self, credentials: &CredentialPair, name: &str) -> String {
        format!("{}/oauth2/v2.0/{name}", credentials.authority(&self.authority_base))
    }

    async fn post_token_form(
        &self,
        credentials: &CredentialPair,
        form: &[(&str, &str)],
    ) -> Result<TokenEndpointReply> {
        let request =
            self.http.request(Method::POST, self.endpoint(credentials, "token")).form(form);
        let response = self.http.send(request).await?;

        if response.status().is_success() {
            let grant = response.json::<TokenResponse>().await.map_err(|e| {
                CalmateError::Auth(format!("Malformed token response: {e}"))
            })?;
            return Ok(TokenEndpointReply::Granted(grant));
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(error) if !error.error.is_empty() => Ok(TokenEndpointReply::Rejected(error)),
            _ => Err(CalmateError::RemoteApi { status: status.as_u16(), body }),
        }
    }

    /// Record `grant` for the account named in its id_token, falling back to
    /// `fallback` when the claims are unusable.
    fn store_grant(
        &self,
        cache: &mut TokenCache,
        tenant_id: &str,
        grant: TokenResponse,
        fallback: Option<&CachedAccount>,
    ) -> AccessToken {
        let account = grant
            .id_token
            .as_deref()
            .and_then(account_from_id_token)
            .or_else(|| fallback.cloned())
            .unwrap_or_else(|| {
                warn!("token response carried no usable id_token; using tenant-scoped account");
                CachedAccount {
                    home_account_id: format!("unknown.{tenant_id}"),
                    username: None,
                    tenant_id: Some(tenant_id.to_string()),
                }
            });

        let token_grant = TokenGrant {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_in: grant.expires_in,
            scope: grant.scope,
        };
        cache.store_grant(account, &token_grant, self.clock.now())
    }
}

/// Requested scopes plus `openid profile offline_access`, space separated.
fn scope_param(scopes: &[String]) -> String {
    let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
    for reserved in RESERVED_SCOPES {
        if !all.iter().any(|s| s.eq_ignore_ascii_case(reserved)) {
            all.push(reserved);
        }
    }
    all.join(" ")
}

fn account_from_id_token(id_token: &str) -> Option<CachedAccount> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;

    let object_id = claims.oid.or(claims.sub)?;
    let home_account_id = match &claims.tid {
        Some(tid) => format!("{object_id}.{tid}"),
        None => object_id,
    };
    Some(CachedAccount {
        home_account_id,
        username: claims.preferred_username,
        tenant_id: claims.tid,
    })
}

async fn unsupported_flow(response: Response) -> CalmateError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<DeviceCodeResponse>(&body) {
        Ok(parsed) => CalmateError::DeviceFlowUnsupported(
            parsed
                .error_description
                .or(parsed.error)
                .unwrap_or_else(|| "device code missing from response".to_string()),
        ),
        Err(_) => CalmateError::RemoteApi { status: status.as_u16(), body },
    }
}

#[async_trait]
impl IdentityProvider for MicrosoftIdentityProvider {
    async fn acquire_token_silent(
        &self,
        credentials: &CredentialPair,
        scopes: &[String],
        account: &CachedAccount,
        cache: &mut TokenCache,
    ) -> Result<Option<AccessToken>> {
        let now = self.clock.now();
        if let Some(token) = cache.access_token(&account.home_account_id) {
            if !token.expires_within(now, TOKEN_REFRESH_THRESHOLD_SECS) {
                debug!("reusing cached access token");
                return Ok(Some(token));
            }
        }

        let Some(refresh_token) = cache.refresh_token(&account.home_account_id).map(str::to_string)
        else {
            return Ok(None);
        };

        let scope = scope_param(scopes);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("scope", scope.as_str()),
        ];

        match self.post_token_form(credentials, &form).await {
            Ok(TokenEndpointReply::Granted(grant)) => {
                debug!(client_id_prefix = credentials.client_id_prefix(), "refreshed access token");
                Ok(Some(self.store_grant(cache, &credentials.tenant_id, grant, Some(account))))
            }
            Ok(TokenEndpointReply::Rejected(error)) => {
                info!(error = %error.error, "refresh token rejected; interaction required");
                if error.error == "invalid_grant" {
                    cache.drop_refresh_token(&account.home_account_id);
                }
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "silent token refresh failed");
                Ok(None)
            }
        }
    }

    async fn initiate_device_flow(
        &self,
        credentials: &CredentialPair,
        scopes: &[String],
    ) -> Result<DeviceAuthorization> {
        let scope = scope_param(scopes);
        let request = self
            .http
            .request(Method::POST, self.endpoint(credentials, "devicecode"))
            .form(&[("client_id", credentials.client_id.as_str()), ("scope", scope.as_str())]);
        let response = self.http.send(request).await?;

        if !response.status().is_success() {
            if response.status().is_server_error() {
                return Err(remote_api_error(response).await);
            }
            return Err(unsupported_flow(response).await);
        }

        let parsed: DeviceCodeResponse = response.json().await.map_err(|e| {
            CalmateError::DeviceFlowUnsupported(format!("Malformed device code response: {e}"))
        })?;

        let (Some(device_code), Some(user_code), Some(verification_uri)) =
            (parsed.device_code, parsed.user_code, parsed.verification_uri)
        else {
            return Err(CalmateError::DeviceFlowUnsupported(
                parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| "device code missing from response".to_string()),
            ));
        };

        info!(
            client_id_prefix = credentials.client_id_prefix(),
            tenant = %credentials.tenant_id,
            "device code flow started"
        );

        Ok(DeviceAuthorization {
            device_code,
            user_code,
            verification_uri,
            message: parsed.message,
            interval_secs: parsed.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            expires_in_secs: parsed.expires_in.unwrap_or(DEFAULT_DEVICE_FLOW_EXPIRY_SECS),
        })
    }

    async fn poll_device_flow(
        &self,
        flow: &DeviceFlowState,
        cache: &mut TokenCache,
    ) -> Result<DevicePoll> {
        let form = [
            ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ("client_id", flow.credentials.client_id.as_str()),
            ("device_code", flow.device_code.as_str()),
        ];

        match self.post_token_form(&flow.credentials, &form).await? {
            TokenEndpointReply::Granted(grant) => {
                let token = self.store_grant(cache, &flow.credentials.tenant_id, grant, None);
                info!(
                    client_id_prefix = flow.credentials.client_id_prefix(),
                    username = token.username().unwrap_or("unknown"),
                    "device code flow completed"
                );
                Ok(DevicePoll::Authorized(token))
            }
            TokenEndpointReply::Rejected(error) => match error.error.as_str() {
                "authorization_pending" => Ok(DevicePoll::Pending),
                "slow_down" => Ok(DevicePoll::SlowDown),
                "access_denied" | "authorization_declined" => Ok(DevicePoll::Denied(
                    error.error_description.unwrap_or_else(|| error.error.clone()),
                )),
                "expired_token" | "code_expired" | "bad_verification_code" => {
                    Ok(DevicePoll::Expired)
                }
                other => Err(CalmateError::Auth(format!(
                    "{other}: {}",
                    error.error_description.as_deref().unwrap_or("token request rejected")
                ))),
            },
        }
    }
}

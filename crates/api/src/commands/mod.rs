//! HTTP handlers - client to backend bridge
//!
//! Callers identify their authentication session with `x-calmate-session`
//! and may override the application registration per request with
//! `x-client-id` / `x-tenant-id`.

pub mod agent;
pub mod auth;
pub mod calendar;
pub mod health;

use axum::http::HeaderMap;
use calmate_core::TokenRequest;
use calmate_domain::{AccessToken, AuthOutcome};
use uuid::Uuid;

use crate::commands::auth::TokenStatus;
use crate::context::AppContext;
use crate::utils::api_error::ApiError;

/// Request and response header carrying the session id
pub const SESSION_HEADER: &str = "x-calmate-session";
/// Per-request client id override
pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Per-request tenant override
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Header value as text; non-UTF-8 values are treated as absent.
pub(crate) fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Response header echoing the caller's session id.
pub(crate) fn session_header(session_id: Uuid) -> [(&'static str, String); 1] {
    [(SESSION_HEADER, session_id.to_string())]
}

pub(crate) fn token_request(headers: &HeaderMap) -> TokenRequest {
    let mut request = TokenRequest::new();
    if let Some(client_id) = header_value(headers, CLIENT_ID_HEADER) {
        request = request.with_client_id(client_id);
    }
    if let Some(tenant_id) = header_value(headers, TENANT_ID_HEADER) {
        request = request.with_tenant_id(tenant_id);
    }
    request
}

/// A token obtained for the caller's session
pub(crate) struct Authorized {
    pub session_id: Uuid,
    pub token: AccessToken,
}

/// Obtain a token for the caller, or fail with the pending/expired/denied
/// payload so the client can drive the device-code sign-in.
pub(crate) async fn ensure_token(
    ctx: &AppContext,
    headers: &HeaderMap,
) -> Result<Authorized, ApiError> {
    let (session_id, session) = ctx.sessions.resolve(header_value(headers, SESSION_HEADER))?;
    let outcome = {
        let mut guard = session.lock().await;
        ctx.auth.get_access_token(&mut guard, &token_request(headers)).await
    };
    drop(session);
    ctx.sessions.release(session_id);

    match outcome? {
        AuthOutcome::Authenticated(token) => Ok(Authorized { session_id, token }),
        outcome => {
            Err(ApiError::NotAuthenticated { session_id, status: TokenStatus::from(&outcome) })
        }
    }
}

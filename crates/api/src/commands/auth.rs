//! Authentication endpoints
//!
//! The device-code sign-in is driven by repeated `POST /auth/token` calls
//! carrying the same session id: the first call returns the prompt, later
//! calls poll until the user completes or abandons the sign-in.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use calmate_core::AuthSession;
use calmate_domain::{AuthOutcome, CachedAccount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{header_value, session_header, token_request, CLIENT_ID_HEADER, SESSION_HEADER};
use crate::context::AppContext;
use crate::utils::api_error::ApiError;
use crate::utils::command_helpers::execute_command;

/// Where the caller's sign-in stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TokenStatus {
    Authenticated {
        username: Option<String>,
        expires_at: DateTime<Utc>,
    },
    Pending {
        verification_uri: String,
        user_code: String,
        message: String,
        expires_at: DateTime<Utc>,
    },
    Expired {
        message: String,
    },
    Denied {
        reason: String,
    },
}

impl TokenStatus {
    /// Short label used in command logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::Pending { .. } => "authentication_pending",
            Self::Expired { .. } => "authentication_expired",
            Self::Denied { .. } => "authentication_denied",
        }
    }
}

impl From<&AuthOutcome> for TokenStatus {
    fn from(outcome: &AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Authenticated(token) => Self::Authenticated {
                username: token.username().map(ToString::to_string),
                expires_at: token.expires_at(),
            },
            AuthOutcome::Pending(prompt) => Self::Pending {
                verification_uri: prompt.verification_uri.clone(),
                user_code: prompt.user_code.clone(),
                message: prompt.message.clone(),
                expires_at: prompt.expires_at,
            },
            AuthOutcome::Expired => Self::Expired {
                message: "The sign-in code expired. Request a new one to try again.".to_string(),
            },
            AuthOutcome::Denied(reason) => Self::Denied { reason: reason.clone() },
        }
    }
}

/// Body of `POST /auth/token` and of 401 responses
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub status: TokenStatus,
}

/// Query of `POST /auth/token`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenParams {
    /// Skip silent reuse and start a fresh device-code flow
    pub force_new_login: bool,
}

/// `POST /auth/token[?force_new_login=true]`
///
/// Always answers 200 with the current status; the token itself never
/// leaves the server.
pub async fn get_token(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(params): Query<TokenParams>,
) -> Result<Response, ApiError> {
    execute_command("auth::get_token", async {
        let (session_id, session) = ctx.sessions.resolve(header_value(&headers, SESSION_HEADER))?;

        let mut request = token_request(&headers);
        if params.force_new_login {
            request = request.force_new_login();
        }

        let outcome = {
            let mut guard = session.lock().await;
            ctx.auth.get_access_token(&mut guard, &request).await
        };
        drop(session);
        ctx.sessions.release(session_id);

        let outcome = outcome?;
        let status = TokenStatus::from(&outcome);

        Ok((session_header(session_id), Json(TokenResponse { session_id, status })).into_response())
    })
    .await
}

/// `POST /auth/logout`
///
/// Clears the stored cache for the effective client and the caller's
/// pending flow. Succeeds when there was nothing to clear.
pub async fn logout(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    execute_command("auth::logout", async {
        let client_id = header_value(&headers, CLIENT_ID_HEADER);

        match ctx.sessions.find(header_value(&headers, SESSION_HEADER))? {
            Some((session_id, session)) => {
                let result = ctx.auth.logout(&mut *session.lock().await, client_id).await;
                drop(session);
                ctx.sessions.release(session_id);
                result?;
            }
            None => {
                ctx.auth.logout(&mut AuthSession::new(), client_id).await?;
            }
        }

        Ok(Json(json!({ "status": "logged_out" })).into_response())
    })
    .await
}

/// Body of `GET /auth/status`
#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub signed_in: bool,
    pub pending_flow: bool,
    pub accounts: Vec<CachedAccount>,
}

/// `GET /auth/status`
///
/// Cached accounts for the effective client; never contacts the identity
/// provider.
pub async fn auth_status(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>, ApiError> {
    execute_command("auth::status", async {
        let accounts = ctx.auth.cached_accounts(header_value(&headers, CLIENT_ID_HEADER)).await?;

        let pending_flow = match ctx.sessions.find(header_value(&headers, SESSION_HEADER))? {
            Some((_, session)) => session.lock().await.has_pending_flow(),
            None => false,
        };

        Ok(Json(AuthStatusResponse { signed_in: !accounts.is_empty(), pending_flow, accounts }))
    })
    .await
}

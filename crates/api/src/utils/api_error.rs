//! Mapping of failures onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use calmate_domain::CalmateError;
use serde_json::json;
use uuid::Uuid;

use crate::commands::auth::{TokenResponse, TokenStatus};
use crate::commands::session_header;
use crate::utils::logging::error_label;

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    Domain(CalmateError),
    /// The caller's session has no usable token yet; the body tells the
    /// client how to proceed (device-code prompt, expired, denied).
    NotAuthenticated { session_id: Uuid, status: TokenStatus },
    /// No language model is configured.
    AgentUnavailable,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(err) => domain_status(err),
            Self::NotAuthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::AgentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Domain(err) => error_label(err),
            Self::NotAuthenticated { status, .. } => status.label(),
            Self::AgentUnavailable => "agent_unavailable",
        }
    }
}

fn domain_status(err: &CalmateError) -> StatusCode {
    match err {
        CalmateError::Config(_) | CalmateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CalmateError::AuthenticationPending(_)
        | CalmateError::AuthenticationExpired(_)
        | CalmateError::AuthenticationDenied(_)
        | CalmateError::Auth(_) => StatusCode::UNAUTHORIZED,
        CalmateError::DeviceFlowUnsupported(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CalmateError::RemoteApi { .. }
        | CalmateError::Network(_)
        | CalmateError::LanguageModel(_) => StatusCode::BAD_GATEWAY,
        CalmateError::Storage(_) | CalmateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CalmateError> for ApiError {
    fn from(err: CalmateError) -> Self {
        Self::Domain(err)
    }
}

fn error_body(kind: &str, message: String) -> Json<serde_json::Value> {
    Json(json!({
        "status": "error",
        "error": { "type": kind, "message": message },
    }))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Domain(err) => (status, error_body(err.kind(), err.to_string())).into_response(),
            Self::NotAuthenticated { session_id, status: token_status } => (
                status,
                session_header(session_id),
                Json(TokenResponse { session_id, status: token_status }),
            )
                .into_response(),
            Self::AgentUnavailable => (
                status,
                error_body(
                    "agent_unavailable",
                    "No language model is configured; set OPENAI_API_KEY".to_string(),
                ),
            )
                .into_response(),
        }
    }
}

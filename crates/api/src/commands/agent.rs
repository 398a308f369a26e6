//! Conversational agent endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use calmate_domain::{CalmateError, ChatTurn};
use serde::Deserialize;
use serde_json::json;

use super::{ensure_token, session_header};
use crate::context::AppContext;
use crate::utils::api_error::ApiError;
use crate::utils::command_helpers::execute_command;

/// Body of `POST /invoke-agent`
#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    /// Earlier turns of the conversation, oldest first
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// `POST /invoke-agent`
///
/// 503 when no language model is configured.
pub async fn invoke_agent(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(request): Json<AgentRequest>,
) -> Result<Response, ApiError> {
    execute_command("agent::invoke", async {
        let agent = ctx.agent.clone().ok_or(ApiError::AgentUnavailable)?;
        if request.query.trim().is_empty() {
            return Err(CalmateError::InvalidInput("query must not be empty".into()).into());
        }

        let auth = ensure_token(&ctx, &headers).await?;
        let response = agent.respond(&auth.token, &request.history, &request.query).await?;

        Ok((
            session_header(auth.session_id),
            Json(json!({ "status": "success", "response": response })),
        )
            .into_response())
    })
    .await
}

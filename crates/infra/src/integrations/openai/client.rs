//! OpenAI API client implementing the agent's language model port
use async_trait::async_trait;
use calmate_core::agent::{AgentMessage, LanguageModel, ModelReply, ToolCall, ToolSpec};
use calmate_domain::constants::{DEFAULT_LLM_API_URL, DEFAULT_LLM_MODEL};
use calmate_domain::{CalmateError, LlmConfig, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FunctionCall, FunctionDefinition,
    OpenAIError, ToolDefinition, WireToolCall,
};
use crate::http::HttpClient;

/// OpenAI API client for tool-calling chat completions
pub struct OpenAIClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
    temperature: f32,
}

impl OpenAIClient {
    /// Defaults to `gpt-4o-mini` at temperature 0.
    pub fn new(api_key: String, http_client: HttpClient) -> Self {
        Self {
            http_client,
            api_key,
            model: DEFAULT_LLM_MODEL.to_string(),
            api_url: DEFAULT_LLM_API_URL.to_string(),
            temperature: 0.0,
        }
    }

    /// Client configured from the `llm` section, or `None` without an API key.
    pub fn from_config(config: &LlmConfig, http_client: HttpClient) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|key| !key.trim().is_empty())?;
        Some(
            Self::new(api_key, http_client)
                .with_model(config.model.clone())
                .with_api_url(config.api_url.clone())
                .with_temperature(config.temperature),
        )
    }

    /// Model name sent with each request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another OpenAI-compatible endpoint
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// One completion round; the agent loop decides what happens next.
    async fn call_api(
        &self,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> std::result::Result<ModelReply, OpenAIError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: messages.iter().map(to_wire_message).collect(),
            temperature: self.temperature,
            tools: tools
                .iter()
                .map(|tool| ToolDefinition {
                    kind: "function",
                    function: FunctionDefinition {
                        name: tool.name,
                        description: tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        };

        let request = self
            .http_client
            .request(Method::POST, &self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload);

        let response = self.http_client.send(request).await.map_err(|err| match err {
            CalmateError::Network(msg) | CalmateError::Internal(msg) => OpenAIError::Network(msg),
            other => OpenAIError::Network(format!("HTTP error: {other}")),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), model = %self.model, "completion response");

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OpenAIError::InvalidSchema(e.to_string()))?;

        if let Some(usage) = &completion.usage {
            debug!(tokens = usage.total_tokens, "OpenAI token usage");
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::InvalidSchema("no choices".to_string()))?;
        debug!(finish_reason = choice.finish_reason.as_deref().unwrap_or("none"), "Model turn done");

        let message = choice.message;
        if message.tool_calls.is_empty() {
            let text = message.content.ok_or_else(|| {
                OpenAIError::InvalidSchema("Reply had neither content nor tool calls".to_string())
            })?;
            return Ok(ModelReply::Message(text));
        }

        let calls = message.tool_calls.into_iter().map(from_wire_tool_call).collect();
        Ok(ModelReply::ToolCalls { content: message.content, calls })
    }
}

async fn classify_failure(status: u16, response: reqwest::Response) -> OpenAIError {
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let message = response.text().await.unwrap_or_default();

    match status {
        401 | 403 => OpenAIError::Authentication(format!("Invalid API key ({status})")),
        429 => OpenAIError::RateLimit(retry_after.unwrap_or(60)),
        _ => OpenAIError::Api { status, message },
    }
}

fn to_wire_message(message: &AgentMessage) -> ChatMessage {
    let plain = |role: &str, content: &str| ChatMessage {
        role: role.to_string(),
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        tool_call_id: None,
    };

    match message {
        AgentMessage::System(content) => plain("system", content),
        AgentMessage::User(content) => plain("user", content),
        AgentMessage::Assistant { content, tool_calls } => ChatMessage {
            role: "assistant".to_string(),
            content: content.clone(),
            tool_calls: tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: None,
        },
        AgentMessage::Tool { call_id, content } => ChatMessage {
            tool_call_id: Some(call_id.clone()),
            ..plain("tool", content)
        },
    }
}

fn from_wire_tool_call(call: WireToolCall) -> ToolCall {
    let raw = call.function.arguments;
    let arguments = if raw.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(tool = %call.function.name, error = %err, "Tool arguments are not valid JSON");
            Value::String(raw.clone())
        })
    };
    ToolCall { id: call.id, name: call.function.name, arguments }
}

impl From<OpenAIError> for CalmateError {
    fn from(err: OpenAIError) -> Self {
        CalmateError::LanguageModel(err.to_string())
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn complete(&self, messages: &[AgentMessage], tools: &[ToolSpec]) -> Result<ModelReply> {
        Ok(self.call_api(messages, tools).await?)
    }
}

//! OpenAI Chat Completions wire types (function calling)
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failures talking to the chat completions endpoint
#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("model endpoint unreachable: {0}")]
    Network(String),

    #[error("model endpoint returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Seconds from `Retry-After`, 60 when absent
    #[error("rate limited, retry after {0}s")]
    RateLimit(u64),

    #[error("model endpoint rejected the API key: {0}")]
    Authentication(String),

    #[error("unexpected completion payload: {0}")]
    InvalidSchema(String),
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    /// Null on assistant turns that only call tools
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FunctionDefinition<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Arguments travel as a JSON-encoded string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tool_call_message() {
        let json = r#"{
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "get_events", "arguments": "{\"time_window\":{}}"}
            }]
        }"#;

        let message: ChatMessage = serde_json::from_str(json).expect("should deserialize");

        assert_eq!(message.content, None);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function.name, "get_events");
    }

    #[test]
    fn tool_result_message_serializes_call_id() {
        let message = ChatMessage {
            role: "tool".into(),
            content: Some("Event deleted successfully.".into()),
            tool_calls: vec![],
            tool_call_id: Some("call_1".into()),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "role": "tool",
                "content": "Event deleted successfully.",
                "tool_call_id": "call_1"
            })
        );
    }
}

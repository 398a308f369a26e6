//! Language model port interfaces

use async_trait::async_trait;
use calmate_domain::Result;
use serde_json::Value;

/// Tool advertised to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Message in the model conversation
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    System(String),
    User(String),
    Assistant { content: Option<String>, tool_calls: Vec<ToolCall> },
    Tool { call_id: String, content: String },
}

/// What the model answered with
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Final text for the user
    Message(String),
    /// The model wants tools run before it answers
    ToolCalls { content: Option<String>, calls: Vec<ToolCall> },
}

/// Tool-calling chat model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[AgentMessage], tools: &[ToolSpec]) -> Result<ModelReply>;
}

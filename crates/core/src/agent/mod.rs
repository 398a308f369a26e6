//! Agent/tool adapter: calendar tools for a tool-calling language model

pub mod ports;
pub mod service;
pub mod tools;

pub use ports::{AgentMessage, LanguageModel, ModelReply, ToolCall, ToolSpec};
pub use service::CalendarAgent;
pub use tools::{format_event_list, CalendarToolbox};

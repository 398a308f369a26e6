//! External service integrations

pub mod graph;
pub mod openai;

pub use graph::GraphCalendarClient;
pub use openai::OpenAIClient;

/// OpenAI-compatible language model for the calendar agent
///
/// # Architecture
///
/// - **Client**: `OpenAIClient` - implements the agent's `LanguageModel` port
///   over the Chat Completions API with `tools` (function calling)
/// - **Types**: wire types for messages, tool definitions and tool calls
/// - **Error Handling**: `OpenAIError`, surfaced to callers as
///   `CalmateError::LanguageModel`
///
/// # Usage
///
/// ```no_run
/// use calmate_infra::http::HttpClient;
/// use calmate_infra::integrations::openai::OpenAIClient;
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let http_client = HttpClient::new()?;
/// let api_key = std::env::var("OPENAI_API_KEY")?;
/// let client = OpenAIClient::new(api_key, http_client).with_model("gpt-4o-mini");
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
///
/// # Error Handling
///
/// - **Network errors / 5xx**: retried by `HttpClient`
/// - **401/403**: authentication error, not retried
/// - **429**: rate limit, surfaced to the caller
pub mod client;
pub mod types;

pub use client::OpenAIClient;
pub use types::OpenAIError;

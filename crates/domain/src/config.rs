//! Configuration structures
//!
//! Every section deserializes with defaults so a partial file (or none at
//! all) yields a usable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTHORITY_BASE, DEFAULT_BIND_ADDRESS, DEFAULT_CACHE_DIR, DEFAULT_GRAPH_TIMEOUT_SECS,
    DEFAULT_LLM_API_URL, DEFAULT_LLM_MODEL, DEFAULT_MAX_POLL_WAIT_SECS, DEFAULT_MAX_TOOL_ROUNDS,
    DEFAULT_SCOPES, DEFAULT_TIME_ZONE, GRAPH_API_BASE,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub graph: GraphConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

/// Identity platform and token cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lowest-precedence client id (after explicit, secrets and environment)
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub authority_base: String,
    pub scopes: Vec<String>,
    pub cache_dir: PathBuf,
    /// Optional TOML file holding `CLIENT_ID` / `TENANT_ID`
    pub secrets_file: Option<PathBuf>,
    /// OS keychain service to read credentials from, if any
    pub keychain_service: Option<String>,
    /// Upper bound on the sleep inserted before a device-flow poll
    pub max_poll_wait_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant_id: None,
            authority_base: DEFAULT_AUTHORITY_BASE.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            secrets_file: None,
            keychain_service: None,
            max_poll_wait_secs: DEFAULT_MAX_POLL_WAIT_SECS,
        }
    }
}

/// Calendar API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub default_time_zone: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: GRAPH_API_BASE.to_string(),
            timeout_secs: DEFAULT_GRAPH_TIMEOUT_SECS,
            default_time_zone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

/// Language model settings for the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// The agent endpoint is disabled when no key is configured.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tool_rounds: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_LLM_API_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: 0.0,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: DEFAULT_BIND_ADDRESS.to_string() }
    }
}

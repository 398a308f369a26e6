//! Application constants
//!
//! Centralized location for the protocol endpoints and defaults shared by the
//! authentication and calendar layers.

// Identity platform
pub const DEFAULT_AUTHORITY_BASE: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TENANT_ID: &str = "common";
pub const DEFAULT_SCOPES: [&str; 2] = ["Calendars.ReadWrite", "User.Read"];
/// Scopes the identity platform adds to every request; needed for refresh
/// tokens and the id_token account claims.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

// Device-code flow
pub const DEFAULT_DEVICE_FLOW_EXPIRY_SECS: u64 = 900;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;
pub const DEFAULT_MAX_POLL_WAIT_SECS: u64 = 30;

/// Cached access tokens closer than this to expiry are refreshed.
pub const TOKEN_REFRESH_THRESHOLD_SECS: i64 = 300;

// Credential lookup keys (secrets file, keychain, environment)
pub const CLIENT_ID_KEY: &str = "CLIENT_ID";
pub const TENANT_ID_KEY: &str = "TENANT_ID";

// Token cache files
pub const CACHE_FILE_PREFIX: &str = "token_cache_";
pub const CACHE_KEY_PREFIX_LEN: usize = 8;
pub const DEFAULT_CACHE_DIR: &str = ".calmate";

// Calendar API
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_TIME_ZONE: &str = "UTC";
pub const DEFAULT_GRAPH_TIMEOUT_SECS: u64 = 30;

// Agent
pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

// HTTP shell
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const SERVICE_NAME: &str = "outlook-calendar-agent";

//! Configuration loader
//!
//! Loads application configuration from a file (if one is found) and then
//! layers environment overrides on top.
//!
//! ## Loading Strategy
//! 1. `CALMATE_CONFIG` names an explicit file, which must exist
//! 2. Otherwise probe the standard locations
//! 3. No file at all yields [`Config::default`]
//! 4. Environment overrides are applied last
//!
//! ## Environment Variables
//! - `CALMATE_AUTHORITY_BASE`: identity platform base URL
//! - `CALMATE_CACHE_DIR`: token cache directory
//! - `CALMATE_SECRETS_FILE`: TOML file with `CLIENT_ID` / `TENANT_ID`
//! - `CALMATE_KEYCHAIN_SERVICE`: OS keychain service holding credentials
//! - `CALMATE_MAX_POLL_WAIT`: longest sleep before a device-flow poll (seconds)
//! - `CALMATE_GRAPH_BASE_URL`: calendar API base URL
//! - `CALMATE_GRAPH_TIMEOUT`: calendar request timeout (seconds)
//! - `CALMATE_LLM_API_URL`, `CALMATE_LLM_MODEL`, `CALMATE_LLM_TEMPERATURE`,
//!   `CALMATE_LLM_MAX_TOOL_ROUNDS`: language model settings
//! - `OPENAI_API_KEY`: language model API key
//! - `CALMATE_BIND_ADDRESS`: HTTP listen address
//!
//! `CLIENT_ID` and `TENANT_ID` are deliberately not read here; the credential
//! resolver consults the environment itself.
//!
//! ## File Locations
//! Probed in order, relative to the working directory:
//! `calmate.toml`, `calmate.json`, `config/calmate.toml`, `config/calmate.json`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use calmate_domain::{CalmateError, Config, Result};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "CALMATE_CONFIG";

const PROBE_PATHS: [&str; 4] =
    ["calmate.toml", "calmate.json", "config/calmate.toml", "config/calmate.json"];

/// Load configuration: file (explicit or probed) or defaults, then
/// environment overrides.
///
/// # Errors
/// Returns `CalmateError::Config` if the explicit file is missing, a file
/// cannot be parsed, or an override has an invalid value.
pub fn load() -> Result<Config> {
    let explicit = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);

    let config = match explicit.or_else(probe_config_paths) {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::info!("No configuration file found, using defaults");
            Config::default()
        }
    };

    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Defaults plus environment overrides, ignoring any configuration file.
///
/// # Errors
/// Returns `CalmateError::Config` if an override has an invalid value.
pub fn load_from_env() -> Result<Config> {
    apply_overrides(Config::default(), |key| std::env::var(key).ok())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and TOML
/// (detected by file extension).
///
/// # Errors
/// Returns `CalmateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CalmateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CalmateError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CalmateError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration, format chosen by extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CalmateError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CalmateError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CalmateError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_in(&cwd)
}

fn probe_in(dir: &Path) -> Option<PathBuf> {
    PROBE_PATHS.iter().map(|relative| dir.join(relative)).find(|path| path.is_file())
}

/// Apply overrides from `lookup` onto `config`. Blank values are ignored.
pub(crate) fn apply_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(value) = get("CALMATE_AUTHORITY_BASE") {
        config.auth.authority_base = value;
    }
    if let Some(value) = get("CALMATE_CACHE_DIR") {
        config.auth.cache_dir = PathBuf::from(value);
    }
    if let Some(value) = get("CALMATE_SECRETS_FILE") {
        config.auth.secrets_file = Some(PathBuf::from(value));
    }
    if let Some(value) = get("CALMATE_KEYCHAIN_SERVICE") {
        config.auth.keychain_service = Some(value);
    }
    if let Some(value) = get("CALMATE_MAX_POLL_WAIT") {
        config.auth.max_poll_wait_secs = parse_value("CALMATE_MAX_POLL_WAIT", &value)?;
    }
    if let Some(value) = get("CALMATE_GRAPH_BASE_URL") {
        config.graph.base_url = value;
    }
    if let Some(value) = get("CALMATE_GRAPH_TIMEOUT") {
        config.graph.timeout_secs = parse_value("CALMATE_GRAPH_TIMEOUT", &value)?;
    }
    if let Some(value) = get("OPENAI_API_KEY") {
        config.llm.api_key = Some(value);
    }
    if let Some(value) = get("CALMATE_LLM_API_URL") {
        config.llm.api_url = value;
    }
    if let Some(value) = get("CALMATE_LLM_MODEL") {
        config.llm.model = value;
    }
    if let Some(value) = get("CALMATE_LLM_TEMPERATURE") {
        config.llm.temperature = parse_value("CALMATE_LLM_TEMPERATURE", &value)?;
    }
    if let Some(value) = get("CALMATE_LLM_MAX_TOOL_ROUNDS") {
        config.llm.max_tool_rounds = parse_value("CALMATE_LLM_MAX_TOOL_ROUNDS", &value)?;
    }
    if let Some(value) = get("CALMATE_BIND_ADDRESS") {
        config.server.bind_address = value;
    }

    Ok(config)
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| CalmateError::Config(format!("Invalid value for {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use calmate_domain::constants::{DEFAULT_LLM_MODEL, GRAPH_API_BASE};
    use tempfile::tempdir;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = apply_overrides(
            Config::default(),
            lookup(&[
                ("CALMATE_GRAPH_BASE_URL", "http://localhost:9000/v1.0"),
                ("OPENAI_API_KEY", " sk-test "),
                ("CALMATE_LLM_MAX_TOOL_ROUNDS", "3"),
                ("CALMATE_CACHE_DIR", "/tmp/calmate-cache"),
            ]),
        )
        .unwrap();

        assert_eq!(config.graph.base_url, "http://localhost:9000/v1.0");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.max_tool_rounds, 3);
        assert_eq!(config.auth.cache_dir, PathBuf::from("/tmp/calmate-cache"));
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
    }

    #[test]
    fn blank_override_is_ignored() {
        let config =
            apply_overrides(Config::default(), lookup(&[("CALMATE_GRAPH_BASE_URL", "   ")]))
                .unwrap();
        assert_eq!(config.graph.base_url, GRAPH_API_BASE);
    }

    #[test]
    fn invalid_number_is_config_error() {
        let err =
            apply_overrides(Config::default(), lookup(&[("CALMATE_GRAPH_TIMEOUT", "soon")]))
                .unwrap_err();
        match err {
            CalmateError::Config(msg) => assert!(msg.contains("CALMATE_GRAPH_TIMEOUT")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/calmate.toml")));
        assert!(matches!(result, Err(CalmateError::Config(_))));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_content = r#"
[auth]
client_id = "11111111-2222"
scopes = ["Calendars.Read"]

[server]
bind_address = "0.0.0.0:8080"
"#;
        let config = parse_config(toml_content, Path::new("calmate.toml")).unwrap();
        assert_eq!(config.auth.client_id.as_deref(), Some("11111111-2222"));
        assert_eq!(config.auth.scopes, vec!["Calendars.Read"]);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("calmate.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn probe_prefers_root_toml_over_nested() {
        let dir = tempdir().unwrap();
        assert!(probe_in(dir.path()).is_none());

        std::fs::create_dir(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("config/calmate.toml"), "").unwrap();
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("config/calmate.toml")));

        std::fs::write(dir.path().join("calmate.json"), "{}").unwrap();
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("calmate.json")));
    }
}

//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;
use std::path::PathBuf;

use calmate_domain::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_TIME_ZONE};
use calmate_infra::config;
use tempfile::Builder;

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "auth": {
            "tenant_id": "contoso.onmicrosoft.com",
            "cache_dir": "/var/lib/calmate",
            "max_poll_wait_secs": 10
        },
        "llm": {
            "model": "gpt-4o",
            "temperature": 0.2
        }
    }"#;

    let mut temp_file =
        Builder::new().suffix(".json").tempfile().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    assert_eq!(config.auth.tenant_id.as_deref(), Some("contoso.onmicrosoft.com"));
    assert_eq!(config.auth.cache_dir, PathBuf::from("/var/lib/calmate"));
    assert_eq!(config.auth.max_poll_wait_secs, 10);
    assert_eq!(config.llm.model, "gpt-4o");
    assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);

    // Sections absent from the file keep their defaults
    assert_eq!(config.graph.default_time_zone, DEFAULT_TIME_ZONE);
    assert_eq!(config.server.bind_address, DEFAULT_BIND_ADDRESS);
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[auth]
keychain_service = "calmate"
secrets_file = "secrets.toml"

[graph]
base_url = "http://127.0.0.1:4010/v1.0"
timeout_secs = 5
"#;

    let mut temp_file =
        Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert_eq!(config.auth.keychain_service.as_deref(), Some("calmate"));
    assert_eq!(config.auth.secrets_file, Some(PathBuf::from("secrets.toml")));
    assert_eq!(config.graph.base_url, "http://127.0.0.1:4010/v1.0");
    assert_eq!(config.graph.timeout_secs, 5);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let mut temp_file =
        Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    temp_file.write_all(b"[auth\nclient_id = ").expect("Failed to write to temp file");

    let result = config::load_from_file(Some(temp_file.path().to_path_buf()));
    assert!(matches!(result, Err(calmate_domain::CalmateError::Config(_))));
}

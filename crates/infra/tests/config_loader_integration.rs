//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! variable maps.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use reportflow_domain::{ExpiredTokenPolicy, GrantType, ReportFlowError};
use reportflow_infra::config;
use secrecy::ExposeSecret;
use tempfile::NamedTempFile;

fn write_with_extension(content: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_with_extension(
        r#"{
            "endpoints": {
                "auth_url": "https://api.example.com/oauth/token",
                "graph_url": "https://graphql.example.com",
                "rest_url": "https://api.example.com"
            },
            "credentials": {
                "client_id": "integration-client",
                "client_secret": "integration-secret",
                "grant_type": "password",
                "scopes": ["create_reports", "delete_reports"],
                "username": "owner",
                "password": "hunter2"
            },
            "token_path": "/tmp/reportflow_token.json",
            "polling": {"max_retries": 8, "base_delay_secs": 2},
            "fanout": {"concurrency": 5},
            "http": {"timeout_secs": 15, "max_attempts": 2}
        }"#,
        "json",
    );

    let config = config::load_from_file(Some(path.clone())).expect("config should load");

    assert_eq!(config.endpoints.auth_url, "https://api.example.com/oauth/token");
    assert_eq!(config.credentials.grant_type, GrantType::Password);
    assert_eq!(config.credentials.client_secret.expose_secret(), "integration-secret");
    assert_eq!(config.token_path, PathBuf::from("/tmp/reportflow_token.json"));
    assert_eq!(config.polling.max_retries, Some(8));
    assert_eq!(config.fanout.concurrency, 5);
    assert_eq!(config.http.timeout_secs, 15);

    let credential = config.credentials.credential().expect("credential should validate");
    assert_eq!(credential.scope_string(), "create_reports delete_reports");

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_with_extension(
        r#"
expired_token_policy = "fail"

[endpoints]
auth_url = "https://api.example.com/oauth/token"
graph_url = "https://graphql.example.com"
rest_url = "https://api.example.com"

[credentials]
client_id = "integration-client"
client_secret = "integration-secret"
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("config should load");

    assert_eq!(config.expired_token_policy, ExpiredTokenPolicy::Fail);
    assert_eq!(config.credentials.grant_type, GrantType::ClientCredentials);
    assert!(config.credentials.scopes.is_empty());
    assert_eq!(config.polling.max_retries, None);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_file_with_missing_section_is_rejected() {
    let path = write_with_extension(
        r#"{"credentials": {"client_id": "id", "client_secret": "secret"}}"#,
        "json",
    );

    let err = config::load_from_file(Some(path.clone())).expect_err("endpoints are required");
    assert!(matches!(err, ReportFlowError::Config(_)));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_variable_map_and_file_agree() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DM_AUTH_URL", "https://api.example.com/oauth/token"),
        ("DM_GRAPH_URL", "https://graphql.example.com"),
        ("DM_REST_URL", "https://api.example.com"),
        ("DM_CLIENT_API", "integration-client"),
        ("DM_CLIENT_SECRET", "integration-secret"),
        ("DM_SCOPES", "create_reports"),
    ]);
    let from_vars =
        config::load_from_vars(|key| vars.get(key).map(|v| v.to_string())).expect("vars load");

    let path = write_with_extension(
        r#"{
            "endpoints": {
                "auth_url": "https://api.example.com/oauth/token",
                "graph_url": "https://graphql.example.com",
                "rest_url": "https://api.example.com"
            },
            "credentials": {
                "client_id": "integration-client",
                "client_secret": "integration-secret",
                "scopes": ["create_reports"]
            }
        }"#,
        "json",
    );
    let from_file = config::load_from_file(Some(path.clone())).expect("file load");

    assert_eq!(from_vars.endpoints, from_file.endpoints);
    assert_eq!(from_vars.credentials.scopes, from_file.credentials.scopes);
    assert_eq!(from_vars.token_path, from_file.token_path);
    assert_eq!(from_vars.polling, from_file.polling);
    assert_eq!(from_vars.fanout, from_file.fanout);
    assert_eq!(from_vars.http, from_file.http);

    std::fs::remove_file(path).ok();
}

//! CLI integration tests.
//!
//! These tests verify the CLI argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use tempfile::NamedTempFile;

use session_registry::cli::{parse_args_from, Args};
use session_registry::config::{Config, ConfigError};

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("session-registry")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert!(result.host.is_none());
    assert!(result.port.is_none());
    assert!(result.config.is_none());
    assert!(result.node_id.is_none());
    assert!(result.api_key.is_none());
    assert!(!result.single_session);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-H",
        "0.0.0.0",
        "-p",
        "8080",
        "-n",
        "connector-2",
        "-k",
        "my-api-key",
        "-l",
        "debug",
        "--single-session",
    ]))
    .unwrap();

    assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
    assert_eq!(result.port, Some(8080));
    assert_eq!(result.node_id.as_deref(), Some("connector-2"));
    assert_eq!(result.api_key.as_deref(), Some("my-api-key"));
    assert_eq!(result.log_level.as_deref(), Some("debug"));
    assert!(result.single_session);
}

#[test]
fn test_cli_config_file() {
    let result = parse_args_from(args(&["-c", "/etc/session-registry.json"])).unwrap();

    assert_eq!(
        result.config.unwrap().to_str().unwrap(),
        "/etc/session-registry.json"
    );
}

#[test]
fn test_cli_invalid_values() {
    assert!(parse_args_from(args(&["-p", "not-a-number"])).is_err());
    assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
    assert!(parse_args_from(args(&["-n", ""])).is_err());
    assert!(parse_args_from(args(&["stray"])).is_err());
}

// ============================================================================
// Configuration Loading Tests
// ============================================================================

#[test]
fn test_config_from_json_file() {
    let file = config_file(
        r#"{
        "server": {
            "host": "192.168.1.100",
            "port": 9000,
            "graceful_shutdown": false
        },
        "node": { "id": "connector-server-1" },
        "registry": { "single_session": true },
        "security": {
            "enabled": true,
            "api_keys": ["key1", "key2"]
        },
        "logging": {
            "level": "debug"
        }
    }"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "192.168.1.100");
    assert_eq!(config.server.port, 9000);
    assert!(!config.server.graceful_shutdown);
    assert_eq!(config.node.id, "connector-server-1");
    assert!(config.registry.single_session);
    assert!(config.security.enabled);
    assert_eq!(config.security.api_keys.len(), 2);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let file = config_file(r#"{ "server": { "port": 4000 } }"#);

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 4000);
    assert!(config.server.graceful_shutdown);
    assert!(!config.registry.single_session);
}

#[test]
fn test_config_invalid_json() {
    let file = config_file("{ not json");
    assert!(matches!(
        Config::from_file(file.path()),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_config_priority_cli_over_file() {
    let file = config_file(
        r#"{
        "server": {
            "host": "10.0.0.1",
            "port": 5000
        },
        "node": { "id": "from-file" }
    }"#,
    );

    let args = Args {
        host: Some("192.168.1.1".parse().unwrap()),
        port: Some(8080),
        node_id: Some("from-cli".to_string()),
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert_eq!(config.server.host, "192.168.1.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.node_id().unwrap().as_str(), "from-cli");
}

#[test]
fn test_config_api_key_enables_auth() {
    let args = Args {
        api_key: Some("secret-key".to_string()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert!(config.security.enabled);
    assert!(config.security.api_keys.contains(&"secret-key".to_string()));
}

#[test]
fn test_config_single_session_flag() {
    let args = Args {
        single_session: true,
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    assert!(config.registry_config().single_session);
}

#[test]
fn test_config_to_server_config() {
    let args = Args {
        host: Some("0.0.0.0".parse().unwrap()),
        port: Some(8080),
        api_key: Some("test-key".to_string()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    let server_config = config.to_server_config().unwrap();

    assert_eq!(server_config.bind_address(), "0.0.0.0:8080");
    assert!(server_config.auth.enabled);
    assert!(server_config.auth.is_valid("test-key"));
}

#[test]
fn test_config_invalid_host_rejected() {
    let file = config_file(r#"{ "server": { "host": "not-an-ip" } }"#);

    let config = Config::from_file(file.path()).unwrap();
    assert!(matches!(
        config.to_server_config(),
        Err(ConfigError::InvalidHost(_))
    ));
}

#[test]
fn test_config_blank_node_id_rejected() {
    let file = config_file(r#"{ "node": { "id": "  " } }"#);

    let config = Config::from_file(file.path()).unwrap();
    assert!(matches!(config.node_id(), Err(ConfigError::MissingNodeId)));
}

//! Configuration management for a registry node.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{AuthConfig, ServerConfig};
use crate::cli::Args;
use crate::session::{NodeId, RegistryConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Admin API server configuration.
    pub server: ServerSection,
    /// Identity of this frontend node.
    pub node: NodeSection,
    /// Registry behaviour.
    pub registry: RegistrySection,
    /// Admin API authentication.
    pub security: SecuritySection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Admin API server section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Close all sessions and drain requests on ctrl-c.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3010,
            graceful_shutdown: true,
        }
    }
}

/// Node identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Identifier stamped on every session this node creates.
    pub id: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: "frontend-server-1".to_string(),
        }
    }
}

/// Registry behaviour section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Allow at most one bound session per user.
    pub single_session: bool,
}

/// Admin API authentication section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// Require an API key on admin routes.
    pub enabled: bool,
    /// Accepted API keys.
    pub api_keys: Vec<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level or filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn add_api_key(&mut self, key: &str) {
        if key.is_empty() {
            return;
        }
        self.security.enabled = true;
        if !self.security.api_keys.iter().any(|k| k == key) {
            self.security.api_keys.push(key.to_string());
        }
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SESSION_REGISTRY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SESSION_REGISTRY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(id) = std::env::var("SESSION_REGISTRY_NODE_ID") {
            if !id.is_empty() {
                self.node.id = id;
            }
        }

        if let Ok(key) = std::env::var("SESSION_REGISTRY_API_KEY") {
            self.add_api_key(&key);
        }

        if let Ok(level) = std::env::var("SESSION_REGISTRY_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref id) = args.node_id {
            self.node.id = id.clone();
        }
        if let Some(ref key) = args.api_key {
            self.add_api_key(key);
        }
        if args.single_session {
            self.registry.single_session = true;
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Settings for the admin API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let auth = if self.security.enabled {
            AuthConfig::with_keys(self.security.api_keys.iter().cloned())
        } else {
            AuthConfig::disabled()
        };

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port).with_auth(auth);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }
        Ok(server_config)
    }

    /// Settings for the session registry.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            single_session: self.registry.single_session,
        }
    }

    /// Identifier of this node.
    pub fn node_id(&self) -> Result<NodeId, ConfigError> {
        if self.node.id.trim().is_empty() {
            return Err(ConfigError::MissingNodeId);
        }
        Ok(NodeId::from(self.node.id.as_str()))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid host address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),
    /// Node identifier is empty.
    #[error("node id must not be empty")]
    MissingNodeId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3010);
        assert_eq!(config.node.id, "frontend-server-1");
        assert!(!config.registry.single_session);
        assert!(!config.security.enabled);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "node": { "id": "connector-server-2" },
            "registry": { "single_session": true },
            "security": { "enabled": true, "api_keys": ["key1", "key2"] }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.node_id().unwrap().as_str(), "connector-server-2");
        assert!(config.registry_config().single_session);
        assert_eq!(config.security.api_keys.len(), 2);
    }

    #[test]
    fn test_config_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "server": { "port": 9000 } }"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.node.id, "frontend-server-1");
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            port: Some(5000),
            node_id: Some("frontend-server-9".to_string()),
            api_key: Some("test-key".to_string()),
            single_session: true,
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.node.id, "frontend-server-9");
        assert!(config.security.enabled);
        assert_eq!(config.security.api_keys, vec!["test-key".to_string()]);
        assert!(config.registry.single_session);
    }

    #[test]
    fn test_apply_args_keeps_unset_fields() {
        let mut config = Config::default();
        config.server.port = 7000;

        config.apply_args(&Args::default());
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_to_server_config() {
        let config = Config::default();
        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 3010);
        assert!(!server_config.auth.enabled);
        assert!(server_config.graceful_shutdown);
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();
        assert!(matches!(
            config.to_server_config(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_empty_node_id() {
        let mut config = Config::default();
        config.node.id = "  ".to_string();
        assert!(matches!(config.node_id(), Err(ConfigError::MissingNodeId)));
    }

    #[test]
    fn test_config_serialization() {
        let json = serde_json::to_string_pretty(&Config::default()).unwrap();
        assert!(json.contains("\"node\""));
        assert!(json.contains("\"single_session\""));
    }
}

//! Command-line interface for the session-registry node.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Admin API host address (overrides config).
    pub host: Option<IpAddr>,
    /// Admin API port (overrides config).
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Identifier of this frontend node.
    pub node_id: Option<String>,
    /// API key for the admin API.
    pub api_key: Option<String>,
    /// Allow at most one bound session per user.
    pub single_session: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("node-id") => {
                let value: String = parser.value()?.parse()?;
                if value.is_empty() {
                    return Err(ArgsError::InvalidValue("node-id", value));
                }
                result.node_id = Some(value);
            }
            Short('k') | Long("api-key") => {
                result.api_key = Some(parser.value()?.parse()?);
            }
            Long("single-session") => {
                result.single_session = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    println!("{}", help_text());
}

/// Help message shown by `--help`.
pub fn help_text() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"session-registry {version}
Frontend session registry node with an admin API

This binary does not accept client connections. Sessions are registered by
the connection layer that embeds the session_registry library; run on its
own, the admin API only ever sees an empty registry.

USAGE:
    session-registry [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Admin API host address [default: 127.0.0.1]
    -p, --port <PORT>       Admin API port [default: 3010]
    -c, --config <FILE>     Path to configuration file (JSON)
    -n, --node-id <ID>      Identifier of this frontend node [default: frontend-server-1]
    -k, --api-key <KEY>     API key required by the admin API
        --single-session    Allow at most one bound session per user
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SESSION_REGISTRY_HOST       Host address (overrides config)
    SESSION_REGISTRY_PORT       Port number (overrides config)
    SESSION_REGISTRY_NODE_ID    Node identifier (overrides config)
    SESSION_REGISTRY_API_KEY    API key (overrides config)
    SESSION_REGISTRY_LOG_LEVEL  Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    # Start with defaults
    session-registry

    # Second frontend on all interfaces, admin API protected
    session-registry -n frontend-server-2 -H 0.0.0.0 -p 3011 -k my-secret-key

    # Start with config file
    session-registry -c /etc/session-registry/config.json
"#
    )
}

/// Print version.
pub fn print_version() {
    println!("session-registry {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Error, Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    #[error(transparent)]
    Lexopt(#[from] lexopt::Error),
    /// Invalid argument value.
    #[error("invalid value for --{0}: '{1}'")]
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    #[error("unexpected argument: '{0}'")]
    UnexpectedArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("session-registry")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_help_states_admin_only() {
        let help = help_text();
        assert!(help.contains("does not accept client connections"));
        assert!(help.contains("--single-session"));
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(result.node_id.is_none());
        assert!(!result.single_session);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_node_id() {
        let result = parse_args_from(args(&["--node-id", "frontend-server-2"])).unwrap();
        assert_eq!(result.node_id.as_deref(), Some("frontend-server-2"));

        assert!(parse_args_from(args(&["-n", ""])).is_err());
    }

    #[test]
    fn test_single_session() {
        let result = parse_args_from(args(&["--single-session"])).unwrap();
        assert!(result.single_session);
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/config.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/config.json")));
    }

    #[test]
    fn test_help_and_version_flags() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_args_from(args(&["-p", "invalid"])).is_err());
        assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());

        let err = parse_args_from(args(&["stray"])).unwrap_err();
        assert!(err.to_string().contains("stray"));
    }
}

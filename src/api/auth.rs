//! API key authentication for the admin API.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// API key configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Whether authentication is enabled.
    pub enabled: bool,
    /// Prefix of the Authorization header value (default: "Bearer ").
    pub prefix: String,
    keys: HashSet<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "Bearer ".to_string(),
            keys: HashSet::new(),
        }
    }
}

impl AuthConfig {
    /// Create a disabled auth config (for development).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Enabled config accepting the given keys.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Check if a key is valid.
    pub fn is_valid(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Get the number of accepted keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Extract the API key from an Authorization header value.
    pub fn extract_key<'a>(&self, header_value: &'a str) -> Option<&'a str> {
        header_value.strip_prefix(self.prefix.as_str())
    }
}

/// Authentication middleware for axum. `/health` is always open.
pub async fn auth_middleware(
    State(config): State<Arc<AuthConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !config.enabled || request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|header| config.extract_key(header))
        .is_some_and(|key| config.is_valid(key));

    if authorized {
        Ok(next.run(request).await)
    } else {
        debug!(path = %request.uri().path(), "rejected unauthenticated admin request");
        Err(StatusCode::UNAUTHORIZED)
    }
}

//! Admin API request and response types.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::session::{ExportedSession, Session};

/// Request body / query of the kick endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KickRequest {
    /// Reason forwarded to the client in the `closing` event.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Session as shown by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: ExportedSession,
    /// Number of attributes set on the session.
    pub attributes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
}

impl SessionSummary {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session: ExportedSession::from(session),
            attributes: session.attributes().len(),
            remote_address: session.remote_address().map(|a| a.to_string()),
        }
    }
}

/// List sessions response.
#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    /// Total number of sessions.
    pub count: usize,
    /// Session summaries.
    pub sessions: Vec<SessionSummary>,
}

impl ListSessionsResponse {
    pub fn new(mut sessions: Vec<SessionSummary>) -> Self {
        sessions.sort_by_key(|s| s.session.id);
        Self {
            count: sessions.len(),
            sessions,
        }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "SESSION_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn session_not_found(id: &str) -> Self {
        Self::new("SESSION_NOT_FOUND", format!("Session '{}' not found", id))
    }

    pub fn user_not_found(uid: &str) -> Self {
        Self::new("USER_NOT_FOUND", format!("No session bound to '{}'", uid))
    }
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a registry error onto an HTTP status and body.
pub fn api_error(err: RegistryError) -> ApiError {
    let status = match err {
        RegistryError::SessionNotFound(_) | RegistryError::UserNotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::AlreadyBound { .. }
        | RegistryError::NotBound(_)
        | RegistryError::MismatchedIdentity { .. }
        | RegistryError::UserAlreadyConnected(_) => StatusCode::CONFLICT,
        RegistryError::AttributeNotStaged(_) => StatusCode::BAD_REQUEST,
        RegistryError::Transport(_) => StatusCode::BAD_GATEWAY,
        RegistryError::LockPoisoned | RegistryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(err.code(), err.to_string())))
}

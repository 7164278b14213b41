//! Admin API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::types::{api_error, ApiError, ErrorResponse, KickRequest, ListSessionsResponse, SessionSummary};
use crate::session::{NodeId, SessionId, SessionRegistry};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub node_id: NodeId,
}

impl AppState {
    pub fn new(registry: SessionRegistry, node_id: impl Into<NodeId>) -> Self {
        Self {
            registry,
            node_id: node_id.into(),
        }
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let sessions = state.registry.count().map_err(api_error)?;
    let users = state.registry.user_count().map_err(api_error)?;

    Ok(Json(serde_json::json!({
        "name": "session-registry",
        "version": env!("CARGO_PKG_VERSION"),
        "node_id": state.node_id,
        "status": "running",
        "sessions": sessions,
        "users": users,
    })))
}

/// List all sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let sessions = state.registry.sessions().map_err(api_error)?;

    Ok(Json(ListSessionsResponse::new(
        sessions
            .iter()
            .map(|s| SessionSummary::from_session(s))
            .collect(),
    )))
}

/// Get one session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<u64>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = state
        .registry
        .get(SessionId::from_raw(session_id))
        .map_err(api_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::session_not_found(&session_id.to_string())),
            )
        })?;

    Ok(Json(SessionSummary::from_session(&session)))
}

/// Kick one session.
pub async fn kick_session(
    State(state): State<AppState>,
    Path(session_id): Path<u64>,
    Query(req): Query<KickRequest>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId::from_raw(session_id);

    if !state.registry.contains(id).map_err(api_error)? {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::session_not_found(&session_id.to_string())),
        ));
    }

    info!(session = %id, "admin kick");
    state
        .registry
        .kick_by_session_id(id, req.reason.as_deref())
        .map_err(api_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the sessions bound to a user.
pub async fn user_sessions(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let sessions = state
        .registry
        .get_by_uid(&uid)
        .map_err(api_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(ErrorResponse::user_not_found(&uid))))?;

    Ok(Json(ListSessionsResponse::new(
        sessions
            .iter()
            .map(|s| SessionSummary::from_session(s))
            .collect(),
    )))
}

/// Kick every session of a user. Kicking a user with no sessions succeeds.
pub async fn kick_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<KickRequest>,
) -> Result<StatusCode, ApiError> {
    info!(uid, "admin kick");
    state
        .registry
        .kick(&uid, req.reason.as_deref())
        .map_err(api_error)?;

    Ok(StatusCode::NO_CONTENT)
}

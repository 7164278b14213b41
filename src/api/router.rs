//! Admin API router and server.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::auth::{auth_middleware, AuthConfig};
use super::handlers::{
    api_info, get_session, health, kick_session, kick_user, list_sessions, user_sessions, AppState,
};

/// Create the admin router without authentication.
pub fn create_router_with_state(state: AppState) -> Router {
    create_router_with_auth(state, AuthConfig::disabled())
}

/// Create the admin router guarded by `auth`.
pub fn create_router_with_auth(state: AppState, auth: AuthConfig) -> Router {
    let session_routes = Router::new()
        .route("/", get(list_sessions))
        .route("/{id}", get(get_session).delete(kick_session));

    let user_routes = Router::new()
        .route("/{uid}/sessions", get(user_sessions))
        .route("/{uid}/kick", post(kick_user));

    let api_v1 = Router::new()
        .route("/", get(api_info))
        .nest("/sessions", session_routes)
        .nest("/users", user_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(middleware::from_fn_with_state(
            Arc::new(auth),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Admin server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Admin API authentication.
    pub auth: AuthConfig,
    /// Stop on ctrl-c instead of running until killed.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3010,
            auth: AuthConfig::disabled(),
            graceful_shutdown: true,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Run the admin API until it fails or, with graceful shutdown enabled,
/// until ctrl-c.
pub async fn serve(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let router = create_router_with_auth(state, config.auth.clone());

    tracing::info!(%addr, "starting session-registry admin API");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server = axum::serve(listener, router);
    let result = if config.graceful_shutdown {
        server.with_graceful_shutdown(shutdown_signal()).await
    } else {
        server.await
    };
    Ok(result?)
}

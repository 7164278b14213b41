//! Admin HTTP API for a registry node.
//!
//! Read and kick access to the sessions of a running frontend node.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/v1` - Node information
//! - `GET /api/v1/sessions` - List all sessions
//! - `GET /api/v1/sessions/{id}` - Get one session
//! - `DELETE /api/v1/sessions/{id}?reason=...` - Kick one session
//! - `GET /api/v1/users/{uid}/sessions` - Sessions bound to a user
//! - `POST /api/v1/users/{uid}/kick` - Kick every session of a user
//!
//! ## Example
//!
//! ```no_run
//! use session_registry::api::{serve, AppState, ServerConfig};
//! use session_registry::SessionRegistry;
//!
//! #[tokio::main]
//! async fn main() -> session_registry::Result<()> {
//!     let state = AppState::new(SessionRegistry::new(), "frontend-server-1");
//!     serve(ServerConfig::new("127.0.0.1", 3010), state).await
//! }
//! ```

pub mod auth;
pub mod handlers;
pub mod router;
pub mod types;

pub use auth::{auth_middleware, AuthConfig};
pub use handlers::AppState;
pub use router::{create_router_with_auth, create_router_with_state, serve, ServerConfig};
pub use types::{ErrorResponse, KickRequest, ListSessionsResponse, SessionSummary};

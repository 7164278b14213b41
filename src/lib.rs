//! # session-registry
//!
//! Session registry for the frontend nodes of a distributed real-time server.
//!
//! The registry tracks every live connection of a node, binds connections
//! to user identities (one identity per connection, any number of
//! connections per identity) and lets backend logic stage attribute edits
//! that are pushed back to the owning node explicitly.
//!
//! The library is meant to be embedded in a node's connection layer, which
//! calls [`SessionRegistry::create`] for each accepted connection. The
//! `session-registry` binary only runs the admin API; it accepts no client
//! connections, so on its own it serves an empty registry.
//!
//! ## Quick Start
//!
//! ```
//! use session_registry::{EventKind, NullTransport, SessionId, SessionRegistry};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> session_registry::Result<()> {
//! let registry = SessionRegistry::new();
//!
//! // A connection arrives.
//! let session = registry.create(SessionId::from_raw(1), "frontend-server-1", NullTransport)?;
//! session.on(EventKind::Closed, |_| println!("connection closed"));
//!
//! // It logs in.
//! registry.bind(session.id(), "changchang")?;
//!
//! // Backend logic stages an attribute and pushes it.
//! let mut view = session.to_frontend_session();
//! view.set("room", "lobby");
//! view.push("room").await?;
//! assert_eq!(session.get("room"), Some("lobby".into()));
//!
//! // Kick every connection of the user.
//! registry.kick("changchang", Some("maintenance"))?;
//! assert!(registry.get(session.id())?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

// Re-export commonly used types
pub use error::{RegistryError, Result};
pub use session::{
    Attributes, ChannelTransport, EventKind, ExportedSession, FrontendSessionView, NodeId,
    NullTransport, RegistryConfig, Session, SessionBackend, SessionEvent, SessionId,
    SessionRegistry, SessionState, Transport, TransportCommand, TransportError, UserId,
};

//! Session management module.
//!
//! A [`Session`] is one live connection. The [`SessionRegistry`] owns every
//! session of a frontend node and indexes them by id and by bound user.
//! Backend logic works through a [`FrontendSessionView`], which stages
//! attribute edits locally and pushes them back on demand.

mod backend;
mod entry;
mod events;
mod frontend;
mod id;
mod registry;
mod state;
mod transport;

pub use backend::SessionBackend;
pub use entry::{Attributes, Session};
pub use events::{EventEmitter, EventKind, Listener, SessionEvent, EVENT_CHANNEL_CAPACITY};
pub use frontend::{ExportedSession, FrontendSessionView};
pub use id::{NodeId, SessionId, UserId};
pub use registry::{RegistryConfig, SessionRegistry};
pub use state::SessionState;
pub use transport::{ChannelTransport, NullTransport, Transport, TransportCommand, TransportError};

pub(crate) use registry::WeakRegistry;

//! Lifecycle event notification for sessions and frontend views.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;

use super::UserId;

/// Buffer size of the broadcast side of an [`EventEmitter`].
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A lifecycle transition of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session was bound to a user.
    Bind { uid: UserId },
    /// The session was unbound from a user.
    Unbind { uid: UserId },
    /// The connection was closed.
    Closed {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Bind { .. } => EventKind::Bind,
            Self::Unbind { .. } => EventKind::Unbind,
            Self::Closed { .. } => EventKind::Closed,
        }
    }
}

/// Event names listeners register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Bind,
    Unbind,
    Closed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback registered with [`EventEmitter::on`].
pub type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Per-object publish/subscribe hub.
///
/// Listeners run synchronously, in registration order, on the thread that
/// performs the transition. Every event is also published on a broadcast
/// channel for async consumers; a lagging receiver loses old events, a
/// listener never does.
pub struct EventEmitter {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
    channel: broadcast::Sender<SessionEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            listeners: RwLock::new(HashMap::new()),
            channel,
        }
    }

    /// Register a listener for one kind of event.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Receive every future event of this emitter.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.channel.subscribe()
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to its listeners, then to subscribers.
    pub fn emit(&self, event: SessionEvent) {
        // Listeners may register more listeners; call them without the lock held.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        for listener in &listeners {
            listener(&event);
        }

        // No receivers is fine.
        let _ = self.channel.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("bind", &self.listener_count(EventKind::Bind))
            .field("unbind", &self.listener_count(EventKind::Unbind))
            .field("closed", &self.listener_count(EventKind::Closed))
            .finish()
    }
}

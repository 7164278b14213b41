//! Connection-level session.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use super::registry::Shared;
use super::{
    EventEmitter, EventKind, FrontendSessionView, NodeId, SessionEvent, SessionId, SessionState,
    Transport, TransportError, UserId, WeakRegistry,
};
use crate::error::RegistryError;
use crate::Result;

/// Attribute bag carried by sessions and frontend views.
pub type Attributes = HashMap<String, Value>;

#[derive(Debug, Default)]
struct Inner {
    uid: Option<UserId>,
    attributes: Attributes,
    state: SessionState,
}

/// Events recorded at their transition, waiting for delivery.
#[derive(Debug, Default)]
struct Outbox {
    queue: VecDeque<SessionEvent>,
    draining: bool,
}

/// Releases delivery when a listener panics mid-drain.
struct DrainGuard<'a>(&'a Mutex<Outbox>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .draining = false;
        }
    }
}

/// One physical connection tracked by a [`SessionRegistry`](super::SessionRegistry).
///
/// Sessions are shared as `Arc<Session>`; the registry hands out the same
/// allocation it indexes, so `Arc::ptr_eq` identifies a session.
pub struct Session {
    id: SessionId,
    node_id: NodeId,
    transport: Arc<dyn Transport>,
    inner: RwLock<Inner>,
    events: EventEmitter,
    outbox: Mutex<Outbox>,
    registry: Weak<Shared>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        node_id: NodeId,
        transport: Arc<dyn Transport>,
        registry: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            node_id,
            transport,
            inner: RwLock::new(Inner::default()),
            events: EventEmitter::new(),
            outbox: Mutex::new(Outbox::default()),
            registry,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// The user this session is bound to, if any.
    pub fn uid(&self) -> Option<UserId> {
        self.read().uid.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.read().uid.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Get an attribute value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().attributes.get(key).cloned()
    }

    /// Set an attribute value. Emits no event.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.write().attributes.insert(key.into(), value.into());
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&self, key: &str) -> Option<Value> {
        self.write().attributes.remove(key)
    }

    /// Snapshot of all attributes.
    pub fn attributes(&self) -> Attributes {
        self.read().attributes.clone()
    }

    pub(crate) fn set_all(&self, attributes: Attributes) {
        self.write().attributes.extend(attributes);
    }

    /// Register a listener for this session's lifecycle events.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, listener);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Queue `event` behind every event of an earlier transition.
    ///
    /// Called with the inner write lock held, so queue order is transition
    /// order.
    fn record(&self, event: SessionEvent) {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .push_back(event);
    }

    /// Deliver queued events in order. Must be called with no registry or
    /// session lock held.
    ///
    /// Only one thread delivers at a time. A caller that finds delivery in
    /// progress returns at once; the thread already delivering picks up its
    /// events. Listeners that re-enter the registry end up on that path too.
    pub(crate) fn flush_events(&self) {
        {
            let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
            if outbox.draining || outbox.queue.is_empty() {
                return;
            }
            outbox.draining = true;
        }

        let _guard = DrainGuard(&self.outbox);
        loop {
            let event = {
                let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
                match outbox.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        // Cleared together with the empty check.
                        outbox.draining = false;
                        return;
                    }
                }
            };
            self.events.emit(event);
        }
    }

    /// Record `uid` as the bound user.
    ///
    /// Returns `Ok(false)` when already bound to the same user. A transition
    /// queues `bind`; the caller flushes once its own locks are released.
    pub(crate) fn bind(&self, uid: &UserId) -> Result<bool> {
        let mut inner = self.write();
        match &inner.uid {
            Some(bound) if bound == uid => Ok(false),
            Some(bound) => Err(RegistryError::AlreadyBound {
                session: self.id,
                bound: bound.clone(),
            }),
            None => {
                inner.uid = Some(uid.clone());
                self.record(SessionEvent::Bind { uid: uid.clone() });
                Ok(true)
            }
        }
    }

    /// Clear the bound user and queue `unbind`.
    pub(crate) fn unbind(&self, uid: &UserId) -> Result<()> {
        let mut inner = self.write();
        match &inner.uid {
            None => Err(RegistryError::NotBound(self.id)),
            Some(bound) if bound != uid => Err(RegistryError::MismatchedIdentity {
                session: self.id,
                bound: bound.clone(),
                requested: uid.clone(),
            }),
            Some(_) => {
                inner.uid = None;
                self.record(SessionEvent::Unbind { uid: uid.clone() });
                Ok(())
            }
        }
    }

    /// Forget the bound user once the session has left the indexes.
    /// Emits nothing.
    pub(crate) fn clear_binding(&self) {
        self.write().uid = None;
    }

    /// Send an event to the client behind this session.
    pub fn send(&self, event: &str, payload: &Value) -> std::result::Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.transport.emit(event, payload)
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.transport.remote_address()
    }

    /// Tear down the connection.
    ///
    /// Only the first call has an effect: it notifies the client with a
    /// `closing` event when a reason is given, asks the transport to disconnect
    /// and fires `closed`. Transport failures are logged and ignored.
    pub fn close(&self, reason: Option<&str>) {
        {
            let mut inner = self.write();
            if !inner.state.close() {
                return;
            }
            self.record(SessionEvent::Closed {
                reason: reason.map(str::to_string),
            });
        }

        if let Some(reason) = reason {
            if let Err(err) = self.transport.emit("closing", &json!({ "reason": reason })) {
                debug!(session = %self.id, error = %err, "closing notice not delivered");
            }
        }

        if let Err(err) = self.transport.disconnect() {
            debug!(session = %self.id, error = %err, "transport disconnect failed");
        }

        self.flush_events();
    }

    /// Build a frontend view of this session.
    ///
    /// Only meaningful on the node owning the connection. The view stages
    /// attribute edits on a copy of the current attributes and pushes them
    /// back through the owning registry.
    pub fn to_frontend_session(&self) -> FrontendSessionView {
        let (uid, attributes) = {
            let inner = self.read();
            (inner.uid.clone(), inner.attributes.clone())
        };
        FrontendSessionView::new(
            self.id,
            self.node_id.clone(),
            uid,
            attributes,
            Arc::new(WeakRegistry::new(self.registry.clone())),
        )
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("node_id", &self.node_id)
            .field("uid", &inner.uid)
            .field("state", &inner.state)
            .field("attributes", &inner.attributes.len())
            .finish()
    }
}

//! Session registry: the connection and identity indexes of a frontend node.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Attributes, NodeId, Session, SessionBackend, SessionId, Transport, UserId};
use crate::error::RegistryError;
use crate::Result;

/// Registry behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Refuse to bind a user that already has a bound session.
    pub single_session: bool,
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<SessionId, Arc<Session>>,
    /// Buckets are kept in bind order and never left empty.
    by_uid: HashMap<UserId, Vec<Arc<Session>>>,
}

impl Indexes {
    fn unindex(&mut self, uid: &UserId, session: &Arc<Session>) {
        if let Some(bucket) = self.by_uid.get_mut(uid) {
            bucket.retain(|s| !Arc::ptr_eq(s, session));
            if bucket.is_empty() {
                self.by_uid.remove(uid);
            }
        }
    }

    fn remove(&mut self, id: SessionId) -> Option<Arc<Session>> {
        let session = self.by_id.remove(&id)?;
        if let Some(uid) = session.uid() {
            self.unindex(&uid, &session);
        }
        Some(session)
    }
}

pub(crate) struct Shared {
    indexes: RwLock<Indexes>,
    config: RegistryConfig,
}

/// Tracks every live session of a frontend node and who it belongs to.
///
/// Both indexes live behind a single lock, so a session is never visible in
/// one and missing from the other. Lifecycle events are published after the
/// lock is released; listeners may call back into the registry.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct SessionRegistry {
    shared: Arc<Shared>,
}

impl SessionRegistry {
    /// Create an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                indexes: RwLock::new(Indexes::default()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Indexes>> {
        self.shared
            .indexes
            .read()
            .map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Indexes>> {
        self.shared
            .indexes
            .write()
            .map_err(|_| RegistryError::LockPoisoned)
    }

    /// Register a new connection.
    ///
    /// Ids are expected to be unique. Reusing one replaces the previous
    /// session, which is dropped from its user bucket as well.
    pub fn create(
        &self,
        id: SessionId,
        node_id: impl Into<NodeId>,
        transport: impl Transport + 'static,
    ) -> Result<Arc<Session>> {
        let session = Arc::new(Session::new(
            id,
            node_id.into(),
            Arc::new(transport),
            Arc::downgrade(&self.shared),
        ));

        let mut indexes = self.write()?;
        if let Some(previous) = indexes.by_id.insert(id, Arc::clone(&session)) {
            warn!(session = %id, "session id reused, replacing previous session");
            if let Some(uid) = previous.uid() {
                indexes.unindex(&uid, &previous);
                previous.clear_binding();
            }
        }

        debug!(session = %id, node = %session.node_id(), "session created");
        Ok(session)
    }

    /// Look up a session by id.
    pub fn get(&self, id: SessionId) -> Result<Option<Arc<Session>>> {
        Ok(self.read()?.by_id.get(&id).cloned())
    }

    /// Sessions bound to `uid`, in bind order.
    ///
    /// `None` when the user has no bound session; never an empty list.
    pub fn get_by_uid(&self, uid: &str) -> Result<Option<Vec<Arc<Session>>>> {
        Ok(self.read()?.by_uid.get(uid).cloned())
    }

    /// Check if a session exists.
    pub fn contains(&self, id: SessionId) -> Result<bool> {
        Ok(self.read()?.by_id.contains_key(&id))
    }

    /// Get the number of live sessions.
    pub fn count(&self) -> Result<usize> {
        Ok(self.read()?.by_id.len())
    }

    /// Get the number of users with at least one bound session.
    pub fn user_count(&self) -> Result<usize> {
        Ok(self.read()?.by_uid.len())
    }

    /// Bind a session to a user.
    ///
    /// Binding again to the same user succeeds without side effects. Binding
    /// a session that belongs to someone else fails with
    /// [`RegistryError::AlreadyBound`].
    pub fn bind(&self, id: SessionId, uid: impl Into<UserId>) -> Result<()> {
        let uid = uid.into();
        let session = {
            let mut indexes = self.write()?;
            let session = indexes
                .by_id
                .get(&id)
                .cloned()
                .ok_or(RegistryError::SessionNotFound(id))?;

            if self.shared.config.single_session
                && !session.is_bound()
                && indexes.by_uid.contains_key(&uid)
            {
                return Err(RegistryError::UserAlreadyConnected(uid));
            }

            if !session.bind(&uid)? {
                return Ok(());
            }
            indexes
                .by_uid
                .entry(uid.clone())
                .or_default()
                .push(Arc::clone(&session));
            session
        };

        debug!(session = %id, uid = %uid, "session bound");
        session.flush_events();
        Ok(())
    }

    /// Unbind a session from a user.
    pub fn unbind(&self, id: SessionId, uid: impl Into<UserId>) -> Result<()> {
        let uid = uid.into();
        let session = {
            let mut indexes = self.write()?;
            let session = indexes
                .by_id
                .get(&id)
                .cloned()
                .ok_or(RegistryError::SessionNotFound(id))?;

            session.unbind(&uid)?;
            indexes.unindex(&uid, &session);
            session
        };

        debug!(session = %id, uid = %uid, "session unbound");
        session.flush_events();
        Ok(())
    }

    /// Write one attribute directly onto a session.
    pub fn import(&self, id: SessionId, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let indexes = self.read()?;
        let session = indexes
            .by_id
            .get(&id)
            .ok_or(RegistryError::SessionNotFound(id))?;
        session.set(key, value);
        Ok(())
    }

    /// Write several attributes directly onto a session.
    ///
    /// Nothing is written when the session does not exist.
    pub fn import_all(&self, id: SessionId, attributes: Attributes) -> Result<()> {
        let indexes = self.read()?;
        let session = indexes
            .by_id
            .get(&id)
            .ok_or(RegistryError::SessionNotFound(id))?;
        session.set_all(attributes);
        Ok(())
    }

    /// Drop a session from both indexes without closing it.
    ///
    /// The returned session is no longer bound. Removing an unknown id is not
    /// an error.
    pub fn remove(&self, id: SessionId) -> Result<Option<Arc<Session>>> {
        let removed = self.write()?.remove(id);
        if let Some(session) = &removed {
            session.clear_binding();
            debug!(session = %id, "session removed");
        }
        Ok(removed)
    }

    /// Close and remove every session bound to `uid`.
    ///
    /// All sessions leave the indexes in one step before any of them is
    /// closed; each fires `closed` exactly once, while still reporting its
    /// uid, and is unbound afterwards. A user without sessions is not an
    /// error.
    pub fn kick(&self, uid: &str, reason: Option<&str>) -> Result<()> {
        let sessions = {
            let mut indexes = self.write()?;
            let Some(sessions) = indexes.by_uid.remove(uid) else {
                return Ok(());
            };
            for session in &sessions {
                indexes.by_id.remove(&session.id());
            }
            sessions
        };

        info!(uid, sessions = sessions.len(), reason, "kicking user");
        for session in &sessions {
            session.close(reason);
            session.clear_binding();
        }
        Ok(())
    }

    /// Close and remove a single session. Unknown ids are not an error.
    pub fn kick_by_session_id(&self, id: SessionId, reason: Option<&str>) -> Result<()> {
        let Some(session) = self.write()?.remove(id) else {
            return Ok(());
        };

        info!(session = %id, reason, "kicking session");
        session.close(reason);
        session.clear_binding();
        Ok(())
    }

    /// Close and remove every session. Used on node shutdown.
    pub fn close_all(&self, reason: Option<&str>) -> Result<usize> {
        let sessions: Vec<Arc<Session>> = {
            let mut indexes = self.write()?;
            indexes.by_uid.clear();
            indexes.by_id.drain().map(|(_, s)| s).collect()
        };

        for session in &sessions {
            session.close(reason);
            session.clear_binding();
        }
        Ok(sessions.len())
    }

    /// Snapshot of every live session.
    pub fn sessions(&self) -> Result<Vec<Arc<Session>>> {
        Ok(self.read()?.by_id.values().cloned().collect())
    }

    /// Visit every session registered at call time.
    ///
    /// The visitor runs on a snapshot, so it may mutate the registry.
    pub fn for_each_session<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Arc<Session>),
    {
        for session in self.sessions()? {
            visitor(&session);
        }
        Ok(())
    }

    /// Visit every session that had a bound user at call time.
    pub fn for_each_bound_session<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Arc<Session>),
    {
        let bound: Vec<Arc<Session>> = self
            .read()?
            .by_uid
            .values()
            .flatten()
            .cloned()
            .collect();

        for session in bound {
            visitor(&session);
        }
        Ok(())
    }

    /// Send a `message` event to one session's client.
    pub fn send_message(&self, id: SessionId, payload: &Value) -> Result<()> {
        let session = self.get(id)?.ok_or(RegistryError::SessionNotFound(id))?;
        session.send("message", payload)?;
        Ok(())
    }

    /// Send a `message` event to every session of a user.
    ///
    /// Returns how many sessions accepted it; per-session failures are
    /// logged and skipped.
    pub fn send_message_by_uid(&self, uid: &str, payload: &Value) -> Result<usize> {
        let sessions = self
            .get_by_uid(uid)?
            .ok_or_else(|| RegistryError::UserNotFound(UserId::from(uid)))?;

        let mut delivered = 0;
        for session in &sessions {
            match session.send("message", payload) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(session = %session.id(), uid, error = %err, "message not delivered")
                }
            }
        }
        Ok(delivered)
    }

    /// Peer address of a session's connection.
    pub fn client_address(&self, id: SessionId) -> Result<Option<SocketAddr>> {
        let session = self.get(id)?.ok_or(RegistryError::SessionNotFound(id))?;
        Ok(session.remote_address())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionBackend for SessionRegistry {
    async fn bind(&self, id: SessionId, uid: &UserId) -> Result<()> {
        SessionRegistry::bind(self, id, uid.clone())
    }

    async fn unbind(&self, id: SessionId, uid: &UserId) -> Result<()> {
        SessionRegistry::unbind(self, id, uid.clone())
    }

    async fn import(&self, id: SessionId, key: &str, value: Value) -> Result<()> {
        SessionRegistry::import(self, id, key, value)
    }

    async fn import_all(&self, id: SessionId, attributes: Attributes) -> Result<()> {
        SessionRegistry::import_all(self, id, attributes)
    }
}

/// Backend used by views created from a live session.
///
/// Holds the registry weakly so sessions do not keep it alive; once it is
/// gone every call reports the session as missing.
pub(crate) struct WeakRegistry(Weak<Shared>);

impl WeakRegistry {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self(shared)
    }

    fn upgrade(&self, id: SessionId) -> Result<SessionRegistry> {
        self.0
            .upgrade()
            .map(|shared| SessionRegistry { shared })
            .ok_or(RegistryError::SessionNotFound(id))
    }
}

#[async_trait]
impl SessionBackend for WeakRegistry {
    async fn bind(&self, id: SessionId, uid: &UserId) -> Result<()> {
        self.upgrade(id)?.bind(id, uid.clone())
    }

    async fn unbind(&self, id: SessionId, uid: &UserId) -> Result<()> {
        self.upgrade(id)?.unbind(id, uid.clone())
    }

    async fn import(&self, id: SessionId, key: &str, value: Value) -> Result<()> {
        self.upgrade(id)?.import(id, key, value)
    }

    async fn import_all(&self, id: SessionId, attributes: Attributes) -> Result<()> {
        self.upgrade(id)?.import_all(id, attributes)
    }
}

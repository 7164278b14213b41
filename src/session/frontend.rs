//! Frontend session view: staged attribute edits with explicit push.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::{
    Attributes, EventEmitter, EventKind, NodeId, Session, SessionBackend, SessionEvent, SessionId,
    UserId,
};
use crate::error::RegistryError;
use crate::Result;

/// Identity-only snapshot of a session, safe to send across processes.
///
/// Attributes are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSession {
    pub id: SessionId,
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<UserId>,
}

impl From<&Session> for ExportedSession {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id(),
            node_id: session.node_id().clone(),
            uid: session.uid(),
        }
    }
}

/// Restricted proxy over a session for logic that must not touch the
/// transport.
///
/// `set` and `get` only ever see the view's own attribute bag. Nothing
/// reaches the real session until [`push`](Self::push) or
/// [`push_all`](Self::push_all) is awaited.
pub struct FrontendSessionView {
    id: SessionId,
    node_id: NodeId,
    uid: Option<UserId>,
    attributes: Attributes,
    events: EventEmitter,
    backend: Arc<dyn SessionBackend>,
}

impl FrontendSessionView {
    pub(crate) fn new(
        id: SessionId,
        node_id: NodeId,
        uid: Option<UserId>,
        attributes: Attributes,
        backend: Arc<dyn SessionBackend>,
    ) -> Self {
        Self {
            id,
            node_id,
            uid,
            attributes,
            events: EventEmitter::new(),
            backend,
        }
    }

    /// Rebuild a view on another node from an exported snapshot.
    ///
    /// The staged bag starts empty since snapshots carry no attributes.
    pub fn from_exported(snapshot: ExportedSession, backend: Arc<dyn SessionBackend>) -> Self {
        Self::new(
            snapshot.id,
            snapshot.node_id,
            snapshot.uid,
            Attributes::new(),
            backend,
        )
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn uid(&self) -> Option<&UserId> {
        self.uid.as_ref()
    }

    /// Read a staged attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Stage an attribute. Invisible to the session until pushed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Drop a staged attribute.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, listener);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Copy one staged attribute onto the session.
    pub async fn push(&self, key: &str) -> Result<()> {
        let value = self
            .attributes
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::AttributeNotStaged(key.to_string()))?;

        debug!(session = %self.id, key, "pushing staged attribute");
        self.backend.import(self.id, key, value).await
    }

    /// Copy every staged attribute onto the session in one step.
    pub async fn push_all(&self) -> Result<()> {
        debug!(
            session = %self.id,
            keys = self.attributes.len(),
            "pushing all staged attributes"
        );
        self.backend
            .import_all(self.id, self.attributes.clone())
            .await
    }

    /// Bind the underlying session to `uid`, then notify view listeners.
    pub async fn bind(&mut self, uid: impl Into<UserId>) -> Result<()> {
        let uid = uid.into();
        self.backend.bind(self.id, &uid).await?;

        if self.uid.as_ref() != Some(&uid) {
            self.uid = Some(uid.clone());
            self.events.emit(SessionEvent::Bind { uid });
        }
        Ok(())
    }

    /// Unbind the underlying session from `uid`, then notify view listeners.
    pub async fn unbind(&mut self, uid: impl Into<UserId>) -> Result<()> {
        let uid = uid.into();
        self.backend.unbind(self.id, &uid).await?;

        self.uid = None;
        self.events.emit(SessionEvent::Unbind { uid });
        Ok(())
    }

    /// Identity snapshot; staged attributes are left out.
    pub fn export(&self) -> ExportedSession {
        ExportedSession {
            id: self.id,
            node_id: self.node_id.clone(),
            uid: self.uid.clone(),
        }
    }
}

impl fmt::Debug for FrontendSessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendSessionView")
            .field("id", &self.id)
            .field("node_id", &self.node_id)
            .field("uid", &self.uid)
            .field("staged", &self.attributes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend that records calls and can be told to fail.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        missing: bool,
    }

    impl RecordingBackend {
        fn missing() -> Self {
            Self {
                missing: true,
                ..Self::default()
            }
        }

        fn record(&self, id: SessionId, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.missing {
                Err(RegistryError::SessionNotFound(id))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SessionBackend for RecordingBackend {
        async fn bind(&self, id: SessionId, uid: &UserId) -> Result<()> {
            self.record(id, format!("bind {uid}"))
        }

        async fn unbind(&self, id: SessionId, uid: &UserId) -> Result<()> {
            self.record(id, format!("unbind {uid}"))
        }

        async fn import(&self, id: SessionId, key: &str, value: Value) -> Result<()> {
            self.record(id, format!("import {key}={value}"))
        }

        async fn import_all(&self, id: SessionId, attributes: Attributes) -> Result<()> {
            let mut keys: Vec<_> = attributes.keys().cloned().collect();
            keys.sort();
            self.record(id, format!("import_all {}", keys.join(",")))
        }
    }

    fn view(backend: Arc<RecordingBackend>) -> FrontendSessionView {
        FrontendSessionView::from_exported(
            ExportedSession {
                id: SessionId::from_raw(1),
                node_id: NodeId::from("frontend-server-1"),
                uid: None,
            },
            backend,
        )
    }

    #[test]
    fn test_set_get_is_local() {
        let mut view = view(Arc::new(RecordingBackend::default()));
        assert!(view.get("key-1").is_none());

        view.set("key-1", "value-1");
        assert_eq!(view.get("key-1"), Some(&json!("value-1")));
        assert_eq!(view.remove("key-1"), Some(json!("value-1")));
        assert!(view.attributes().is_empty());
    }

    #[tokio::test]
    async fn test_push_forwards_single_key() {
        let backend = Arc::new(RecordingBackend::default());
        let mut view = view(Arc::clone(&backend));
        view.set("key-1", "value-1");
        view.set("key-2", json!({}));

        view.push("key-1").await.unwrap();
        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec!["import key-1=\"value-1\"".to_string()]
        );
    }

    #[tokio::test]
    async fn test_push_unstaged_key_never_reaches_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let view = view(Arc::clone(&backend));

        let err = view.push("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::AttributeNotStaged(key) if key == "missing"));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_all_is_one_call() {
        let backend = Arc::new(RecordingBackend::default());
        let mut view = view(Arc::clone(&backend));
        view.set("key-1", "value-1");
        view.set("key-2", json!({}));

        view.push_all().await.unwrap();
        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec!["import_all key-1,key-2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_bind_emits_on_view() {
        let backend = Arc::new(RecordingBackend::default());
        let mut view = view(backend);
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        view.on(EventKind::Bind, move |event| {
            seen.lock().unwrap().push(event.clone())
        });

        view.bind("changchang").await.unwrap();
        view.bind("changchang").await.unwrap();

        assert_eq!(view.uid(), Some(&UserId::from("changchang")));
        assert_eq!(
            *events.lock().unwrap(),
            vec![SessionEvent::Bind {
                uid: UserId::from("changchang")
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_bind_leaves_view_untouched() {
        let backend = Arc::new(RecordingBackend::missing());
        let mut view = view(backend);
        let mut rx = view.subscribe();

        let err = view.bind("py").await.unwrap_err();
        assert!(matches!(err, RegistryError::SessionNotFound(_)));
        assert!(view.uid().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unbind_emits_on_view() {
        let backend = Arc::new(RecordingBackend::default());
        let mut view = view(backend);
        view.bind("py").await.unwrap();
        let mut rx = view.subscribe();

        view.unbind("py").await.unwrap();
        assert!(view.uid().is_none());
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Unbind {
                uid: UserId::from("py")
            }
        );
    }

    #[test]
    fn test_export_excludes_attributes() {
        let mut view = view(Arc::new(RecordingBackend::default()));
        view.set("secret", "staged");

        let exported = view.export();
        assert_eq!(exported.id, view.id());
        assert_eq!(&exported.node_id, view.node_id());

        let json = serde_json::to_value(&exported).unwrap();
        assert_eq!(json, json!({"id": 1, "node_id": "frontend-server-1"}));
    }

    #[test]
    fn test_exported_session_roundtrip_through_json() {
        let exported = ExportedSession {
            id: SessionId::from_raw(9),
            node_id: NodeId::from("frontend-server-2"),
            uid: Some(UserId::from("py")),
        };
        let json = serde_json::to_string(&exported).unwrap();
        let back: ExportedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, exported);
    }
}

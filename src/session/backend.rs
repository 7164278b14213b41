//! The boundary a frontend view crosses to reach the registry that owns its
//! session.
//!
//! On the frontend node the registry itself implements [`SessionBackend`].
//! Backend nodes plug in an RPC client that forwards the same calls to the
//! frontend; the wire encoding is left to that client.

use async_trait::async_trait;
use serde_json::Value;

use super::{Attributes, SessionId, UserId};
use crate::Result;

/// Operations a [`FrontendSessionView`](super::FrontendSessionView) forwards
/// to the node owning the session.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Bind the session to `uid`. Same semantics as
    /// [`SessionRegistry::bind`](super::SessionRegistry::bind).
    async fn bind(&self, id: SessionId, uid: &UserId) -> Result<()>;

    /// Unbind the session from `uid`.
    async fn unbind(&self, id: SessionId, uid: &UserId) -> Result<()>;

    /// Write one attribute straight onto the session.
    async fn import(&self, id: SessionId, key: &str, value: Value) -> Result<()>;

    /// Write several attributes in one step.
    async fn import_all(&self, id: SessionId, attributes: Attributes) -> Result<()>;
}

//! Connection transport seam.
//!
//! A session never owns its socket. The connection layer hands the registry
//! something implementing [`Transport`], and the session only uses it to push
//! events to the client and to ask for a disconnect.

use std::net::SocketAddr;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Errors reported by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The connection is already gone.
    #[error("connection closed")]
    Closed,

    /// Transport-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Handle to the physical connection behind a session.
///
/// Implementations must not block: `disconnect` in particular is called while
/// tearing sessions down and is expected to be fire-and-forget.
pub trait Transport: Send + Sync {
    /// Send a named event with a JSON payload to the client.
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError>;

    /// Ask the connection to close.
    fn disconnect(&self) -> Result<(), TransportError>;

    /// Peer address, when the transport knows it.
    fn remote_address(&self) -> Option<SocketAddr> {
        None
    }
}

/// Transport that accepts and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn emit(&self, _event: &str, _payload: &Value) -> Result<(), TransportError> {
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Instruction forwarded by a [`ChannelTransport`] to the task owning the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Emit { event: String, payload: Value },
    Disconnect,
}

/// Transport that forwards commands to the connection task over an unbounded
/// channel, so neither `emit` nor `disconnect` ever waits.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<TransportCommand>,
    remote: Option<SocketAddr>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the connection task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, remote: None }, rx)
    }

    /// Record the peer address reported by [`Transport::remote_address`].
    pub fn with_remote_address(mut self, addr: SocketAddr) -> Self {
        self.remote = Some(addr);
        self
    }

    fn send(&self, command: TransportCommand) -> Result<(), TransportError> {
        trace!(?command, "forwarding transport command");
        self.tx.send(command).map_err(|_| TransportError::Closed)
    }
}

impl Transport for ChannelTransport {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError> {
        self.send(TransportCommand::Emit {
            event: event.to_string(),
            payload: payload.clone(),
        })
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.send(TransportCommand::Disconnect)
    }

    fn remote_address(&self) -> Option<SocketAddr> {
        self.remote
    }
}

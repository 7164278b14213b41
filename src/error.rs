//! Error types for the session registry.

use thiserror::Error;

use crate::session::{SessionId, TransportError, UserId};

/// Main error type for registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No live session carries the given ID.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session is already bound to a different user.
    #[error("session {session} is already bound to {bound}")]
    AlreadyBound { session: SessionId, bound: UserId },

    /// Unbind was requested on a session with no bound user.
    #[error("session {0} is not bound")]
    NotBound(SessionId),

    /// Unbind was requested with a user that does not own the session.
    #[error("session {session} is bound to {bound}, not {requested}")]
    MismatchedIdentity {
        session: SessionId,
        bound: UserId,
        requested: UserId,
    },

    /// Single-session mode is on and the user already has a session.
    #[error("user {0} already has a bound session")]
    UserAlreadyConnected(UserId),

    /// No session is bound to the given user.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// A push named a key that has no staged value.
    #[error("attribute not staged: {0}")]
    AttributeNotStaged(String),

    /// The connection transport rejected a message.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Stable machine-readable code, used by the admin API.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::AlreadyBound { .. } => "ALREADY_BOUND",
            Self::NotBound(_) => "NOT_BOUND",
            Self::MismatchedIdentity { .. } => "MISMATCHED_IDENTITY",
            Self::UserAlreadyConnected(_) => "USER_ALREADY_CONNECTED",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::AttributeNotStaged(_) => "ATTRIBUTE_NOT_STAGED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::LockPoisoned | Self::Io(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convenience Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

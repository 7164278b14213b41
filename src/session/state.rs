//! Session lifecycle state.

/// Lifecycle state of a connection-level session.
///
/// Binding is tracked separately through the session's user id; this only
/// records whether the underlying connection has been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connection is live.
    #[default]
    Active,
    /// Connection has been closed. Terminal.
    Closed,
}

impl SessionState {
    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Move to `Closed`.
    ///
    /// Returns `true` only for the call that performed the transition, so the
    /// caller can fire close notifications exactly once.
    pub fn close(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        *self = SessionState::Closed;
        true
    }
}

use std::fmt::{Display, Formatter, Result as FormatResult};

/// Protocol state of a [`Session`](crate::session::Session).
///
/// `Disconnected` is initial. `Closed` is reached through logout and behaves
/// like `Disconnected` for a subsequent login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingHandshakeAck,
    Ready,
    Closed,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

impl Display for SessionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingHandshakeAck => "awaiting handshake ack",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        formatter.write_str(name)
    }
}

//! Change notifications emitted by the call core.

use std::fmt;
use std::time::Duration;

use crate::local::LocalStateView;
use crate::media::ConnectionState;
use crate::registry::ParticipantSnapshot;

/// Why a call ended, as reported by `CallEvent::CallEnded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEndReason {
    /// The local user hung up.
    Hangup,
    /// The owning view went away.
    Unmounted,
    /// The host ended the call for everyone.
    EndedForAll,
    /// The engine dropped the connection.
    ConnectionLost(String),
    /// The join attempt failed and was cleaned up.
    JoinFailed(String),
}

impl fmt::Display for CallEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hangup => f.write_str("hangup"),
            Self::Unmounted => f.write_str("unmounted"),
            Self::EndedForAll => f.write_str("ended for all"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
            Self::JoinFailed(reason) => write!(f, "join failed: {reason}"),
        }
    }
}

/// Events published on the call's event bus.
#[derive(Debug, Clone)]
pub enum CallEvent {
    ParticipantsChanged(ParticipantSnapshot),
    LocalStateChanged(LocalStateView),
    Connection {
        state: ConnectionState,
        reason: Option<String>,
    },
    /// Time since the session reached `Joined`.
    DurationTick(Duration),
    CallEnded(CallEndReason),
}

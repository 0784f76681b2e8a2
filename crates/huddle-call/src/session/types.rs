//! Session record types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use huddle_common::{ParticipantId, SessionId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    /// Transient: a join is in flight.
    Joining,
    Joined,
}

/// One join-to-leave membership of the local participant in a channel.
#[derive(Debug, Clone)]
pub struct CallSession {
    /// Fresh per session; ties the log lines of one call together.
    pub session_id: SessionId,
    pub channel_name: String,
    pub state: SessionState,
    /// Identity assigned by the engine. `None` until the network join returns.
    pub local_identity: Option<ParticipantId>,
    /// When the session reached `Joined`.
    pub started_at: Option<DateTime<Utc>>,
}

impl CallSession {
    pub fn joining(channel_name: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::new(),
            channel_name: channel_name.into(),
            state: SessionState::Joining,
            local_identity: None,
            started_at: None,
        }
    }

    /// Time in call at `now`. Zero before the session is joined.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.started_at
            .and_then(|start| (now - start).to_std().ok())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Joining | SessionState::Joined)
    }
}

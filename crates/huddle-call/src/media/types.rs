//! Track handles and connection states shared by the engine and the orchestrator.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// What a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    /// Camera video.
    Video,
    /// Screen capture video.
    Screen,
}

impl MediaKind {
    /// Camera and screen compete for the single local video slot.
    pub fn occupies_video_slot(&self) -> bool {
        matches!(self, Self::Video | Self::Screen)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Screen => "screen",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally captured track created by the engine.
///
/// Implementations must make `close` idempotent.
pub trait LocalTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    fn kind(&self) -> MediaKind;
    /// Mute (false) or unmute (true) without releasing the device.
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    /// Stop capture and release the underlying device.
    fn close(&self);
    fn is_closed(&self) -> bool;
}

pub type LocalTrackRef = Arc<dyn LocalTrack>;

/// A subscribed remote track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: MediaKind,
}

/// Engine connection state as reported through `ConnectionStateChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Disconnecting,
}

//! The [`MediaEngine`] trait and its event stream.

use async_trait::async_trait;
use huddle_common::{CallError, MediaError, ParticipantId};
use huddle_config::schema::{ScreenQuality, VideoQuality};
use tokio::sync::mpsc;

use super::types::{ConnectionState, LocalTrackRef, MediaKind, RemoteTrack};

/// Callbacks raised by the engine, delivered in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UserPublished {
        identity: ParticipantId,
        kind: MediaKind,
    },
    UserUnpublished {
        identity: ParticipantId,
        kind: MediaKind,
    },
    UserLeft {
        identity: ParticipantId,
    },
    ConnectionStateChanged {
        state: ConnectionState,
        /// Set when the engine dropped the connection on its own.
        reason: Option<String>,
    },
}

pub type EngineEvents = mpsc::Receiver<EngineEvent>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine rejected request: {0}")]
    Rejected(String),

    #[error("engine is not connected")]
    NotConnected,

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<EngineError> for CallError {
    fn from(e: EngineError) -> Self {
        CallError::Network(e.to_string())
    }
}

/// Network and capture operations of the underlying media engine.
///
/// The engine is not required to tolerate two concurrent `join` calls;
/// callers serialize joins.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Prepare the engine and hand out its event stream. Called once.
    async fn initialize(&self) -> Result<EngineEvents, EngineError>;

    /// Join `channel`. Returns the identity the engine assigned, which may
    /// differ from `identity`.
    async fn join(
        &self,
        app_id: &str,
        channel: &str,
        token: Option<&str>,
        identity: Option<&ParticipantId>,
    ) -> Result<ParticipantId, EngineError>;

    async fn leave(&self) -> Result<(), EngineError>;

    async fn publish(&self, tracks: &[LocalTrackRef]) -> Result<(), EngineError>;

    async fn unpublish(&self, tracks: &[LocalTrackRef]) -> Result<(), EngineError>;

    async fn subscribe(
        &self,
        participant: &ParticipantId,
        kind: MediaKind,
    ) -> Result<RemoteTrack, EngineError>;

    async fn unsubscribe(
        &self,
        participant: &ParticipantId,
        kind: MediaKind,
    ) -> Result<(), EngineError>;

    /// Open microphone and camera together. Returns `(audio, video)`.
    async fn create_microphone_and_camera_tracks(
        &self,
        quality: VideoQuality,
    ) -> Result<(LocalTrackRef, LocalTrackRef), MediaError>;

    async fn create_microphone_track(&self) -> Result<LocalTrackRef, MediaError>;

    async fn create_camera_track(&self, quality: VideoQuality) -> Result<LocalTrackRef, MediaError>;

    async fn create_screen_track(&self, quality: ScreenQuality) -> Result<LocalTrackRef, MediaError>;
}

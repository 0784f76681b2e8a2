//! Per-participant published-track state.

use std::sync::Arc;

use huddle_common::ParticipantId;

use crate::media::{MediaKind, RemoteTrack};

/// What one remote participant currently publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParticipant {
    pub identity: ParticipantId,
    pub has_audio: bool,
    pub has_video: bool,
    pub has_screen: bool,
    pub audio_track: Option<RemoteTrack>,
    pub video_track: Option<RemoteTrack>,
    pub screen_track: Option<RemoteTrack>,
}

impl RemoteParticipant {
    pub fn new(identity: ParticipantId) -> Self {
        Self {
            identity,
            has_audio: false,
            has_video: false,
            has_screen: false,
            audio_track: None,
            video_track: None,
            screen_track: None,
        }
    }

    pub fn track(&self, kind: MediaKind) -> Option<&RemoteTrack> {
        match kind {
            MediaKind::Audio => self.audio_track.as_ref(),
            MediaKind::Video => self.video_track.as_ref(),
            MediaKind::Screen => self.screen_track.as_ref(),
        }
    }

    pub fn is_publishing(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.has_audio,
            MediaKind::Video => self.has_video,
            MediaKind::Screen => self.has_screen,
        }
    }

    /// Set or clear the flag and track for `kind` together.
    pub(crate) fn set_track(&mut self, kind: MediaKind, track: Option<RemoteTrack>) {
        let present = track.is_some();
        match kind {
            MediaKind::Audio => {
                self.has_audio = present;
                self.audio_track = track;
            }
            MediaKind::Video => {
                self.has_video = present;
                self.video_track = track;
            }
            MediaKind::Screen => {
                self.has_screen = present;
                self.screen_track = track;
            }
        }
    }
}

/// Immutable, insertion-ordered view of the registry.
pub type ParticipantSnapshot = Arc<[RemoteParticipant]>;

//! Local track slots and their mute flags.

use serde::Serialize;

use crate::media::LocalTrackRef;

/// Mute/share flags as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalStateView {
    pub audio_muted: bool,
    pub video_muted: bool,
    pub is_screen_sharing: bool,
}

/// Tracks held by the current session.
///
/// `video_track` and `screen_track` share one video slot: at most one
/// of them is ever set.
#[derive(Debug, Clone)]
pub struct LocalMediaState {
    pub audio_track: Option<LocalTrackRef>,
    pub video_track: Option<LocalTrackRef>,
    pub screen_track: Option<LocalTrackRef>,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub is_screen_sharing: bool,
    /// Camera mute flag to restore when screen sharing stops.
    pub(crate) resume_camera_muted: bool,
}

impl Default for LocalMediaState {
    fn default() -> Self {
        Self {
            audio_track: None,
            video_track: None,
            screen_track: None,
            audio_muted: true,
            video_muted: true,
            is_screen_sharing: false,
            resume_camera_muted: false,
        }
    }
}

impl LocalMediaState {
    pub fn view(&self) -> LocalStateView {
        LocalStateView {
            audio_muted: self.audio_muted,
            video_muted: self.video_muted,
            is_screen_sharing: self.is_screen_sharing,
        }
    }

    /// Whichever track currently occupies the video slot.
    pub fn video_slot(&self) -> Option<&LocalTrackRef> {
        self.screen_track.as_ref().or(self.video_track.as_ref())
    }

    /// Every track held, audio first.
    pub fn tracks(&self) -> Vec<LocalTrackRef> {
        [&self.audio_track, &self.video_track, &self.screen_track]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Remove every track and reset the flags.
    pub fn take_tracks(&mut self) -> Vec<LocalTrackRef> {
        let tracks = self.tracks();
        *self = Self::default();
        tracks
    }

    /// Re-derive the mute flags from the tracks actually held.
    pub(crate) fn sync_flags(&mut self) {
        self.audio_muted = self.audio_track.as_ref().map_or(true, |t| !t.is_enabled());
        self.video_muted = self.video_track.as_ref().map_or(true, |t| !t.is_enabled());
        self.is_screen_sharing = self.screen_track.is_some();
    }
}

//! View-model types derived from session and registry state.

use std::time::Duration;

use huddle_common::ParticipantId;
use serde::Serialize;

/// Whether the local user is creating the call or joining one in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinIntent {
    Start,
    Join,
}

/// Side panel shown next to the video grid. UI-only state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SidePanel {
    Participants,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Idle,
    Connecting,
    InCall,
}

/// State of one local device button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceToggle {
    /// A track exists for this device.
    pub available: bool,
    pub muted: bool,
}

/// What fills the main stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallLayout {
    Grid,
    /// A remote participant's screen share. Takes precedence over the
    /// local one.
    RemoteScreen {
        sharer: ParticipantId,
        label: String,
    },
    LocalScreen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantTile {
    pub identity: ParticipantId,
    pub label: String,
    pub has_audio: bool,
    pub has_video: bool,
    pub is_sharing: bool,
}

/// Everything the call screen renders, derived in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallView {
    pub phase: CallPhase,
    pub channel: Option<String>,
    pub local_identity: Option<ParticipantId>,
    pub elapsed: Duration,
    pub audio: DeviceToggle,
    pub video: DeviceToggle,
    pub screen_sharing: bool,
    pub layout: CallLayout,
    pub tiles: Vec<ParticipantTile>,
    pub panel: Option<SidePanel>,
}

impl CallView {
    /// Clock text for the duration badge, `MM:SS` or `H:MM:SS`.
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

//! Pure derivation of [`CallView`] from session and registry state.

use std::time::Duration;

use huddle_common::ParticipantId;

use crate::collab::MembershipDirectory;
use crate::local::LocalStateView;
use crate::registry::RemoteParticipant;
use crate::session::{CallSession, SessionState};

use super::types::{CallLayout, CallPhase, CallView, DeviceToggle, ParticipantTile, SidePanel};

/// Everything a view is derived from, read at one instant.
pub(super) struct ViewInputs<'a> {
    pub session: Option<&'a CallSession>,
    pub local: LocalStateView,
    pub audio_available: bool,
    pub video_available: bool,
    pub participants: &'a [RemoteParticipant],
    pub sharer: Option<&'a RemoteParticipant>,
    pub panel: Option<SidePanel>,
    pub elapsed: Duration,
    pub directory: Option<&'a dyn MembershipDirectory>,
}

pub(super) fn build(inputs: ViewInputs<'_>) -> CallView {
    let phase = match inputs.session.map(|s| s.state) {
        Some(SessionState::Joined) => CallPhase::InCall,
        Some(SessionState::Joining) => CallPhase::Connecting,
        Some(SessionState::Disconnected) | None => CallPhase::Idle,
    };

    let layout = match inputs.sharer {
        Some(sharer) => CallLayout::RemoteScreen {
            sharer: sharer.identity.clone(),
            label: tile_label(inputs.directory, &sharer.identity),
        },
        None if inputs.local.is_screen_sharing => CallLayout::LocalScreen,
        None => CallLayout::Grid,
    };

    let tiles = inputs
        .participants
        .iter()
        .map(|p| ParticipantTile {
            identity: p.identity.clone(),
            label: tile_label(inputs.directory, &p.identity),
            has_audio: p.has_audio,
            has_video: p.has_video,
            is_sharing: p.has_screen,
        })
        .collect();

    CallView {
        phase,
        channel: inputs.session.map(|s| s.channel_name.clone()),
        local_identity: inputs.session.and_then(|s| s.local_identity.clone()),
        elapsed: inputs.elapsed,
        audio: DeviceToggle {
            available: inputs.audio_available,
            muted: inputs.local.audio_muted,
        },
        video: DeviceToggle {
            available: inputs.video_available,
            muted: inputs.local.video_muted,
        },
        screen_sharing: inputs.local.is_screen_sharing,
        layout,
        tiles,
        panel: inputs.panel,
    }
}

/// Directory name, else a generic label built from the identity.
pub(super) fn tile_label(directory: Option<&dyn MembershipDirectory>, identity: &ParticipantId) -> String {
    directory
        .and_then(|d| d.display_name(identity))
        .unwrap_or_else(|| format!("Participant {identity}"))
}

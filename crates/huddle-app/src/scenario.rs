//! Scripted call against the loopback engine.

use std::time::Duration;

use huddle_call::{
    CallController, CallEndReason, CallEvent, JoinIntent, LoopbackEngine, MediaKind,
    SidePanel, StaticDirectory,
};
use huddle_common::{CallError, ParticipantId};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::cli::Args;

fn peer_id(n: usize) -> String {
    format!("peer-{n}")
}

/// Display names for the simulated peers.
pub fn directory(peers: usize) -> StaticDirectory {
    (1..=peers).fold(StaticDirectory::new(), |dir, n| {
        dir.with(peer_id(n), format!("Study buddy {n}"))
    })
}

/// Join, let peers publish and share, exercise the local controls, leave.
pub async fn run(
    engine: &LoopbackEngine,
    controller: &CallController,
    args: &Args,
) -> Result<(), CallError> {
    let step = Duration::from_secs(args.duration_secs.max(1)) / 6;
    let identity = args.identity.clone().map(ParticipantId::from);

    let assigned = controller
        .join(&args.channel, identity, JoinIntent::Start)
        .await?;
    info!(channel = %args.channel, identity = %assigned, "In call");

    for n in 1..=args.peers {
        engine.publish_remote(&peer_id(n), MediaKind::Audio);
        engine.publish_remote(&peer_id(n), MediaKind::Video);
    }
    controller.set_panel(Some(SidePanel::Participants));
    tokio::time::sleep(step).await;
    log_view(controller).await;

    if args.peers > 0 {
        engine.publish_remote(&peer_id(1), MediaKind::Screen);
    }
    controller.toggle_audio();
    controller.toggle_video();
    tokio::time::sleep(step).await;
    log_view(controller).await;

    if let Err(e) = controller.toggle_screen_share().await {
        warn!("Screen share unavailable: {e}");
    }
    if args.peers > 1 {
        engine.publish_remote(&peer_id(2), MediaKind::Screen);
        engine.unpublish_remote(&peer_id(1), MediaKind::Screen);
    }
    tokio::time::sleep(step).await;
    log_view(controller).await;

    if let Err(e) = controller.toggle_screen_share().await {
        warn!("Stopping screen share failed: {e}");
    }
    controller.toggle_video();
    if args.peers > 0 {
        engine.remove_remote(&peer_id(args.peers));
    }
    tokio::time::sleep(step * 3).await;
    log_view(controller).await;

    controller.leave(CallEndReason::Hangup).await;
    Ok(())
}

async fn log_view(controller: &CallController) {
    let view = controller.view().await;
    info!(
        phase = ?view.phase,
        elapsed = %view.elapsed_label(),
        participants = view.tiles.len(),
        layout = ?view.layout,
        "Call view"
    );
    match serde_json::to_string(&view) {
        Ok(json) => debug!("{json}"),
        Err(e) => warn!("Failed to serialize call view: {e}"),
    }
}

/// Log every call event until the bus closes.
pub async fn log_events(mut events: broadcast::Receiver<CallEvent>) {
    loop {
        match events.recv().await {
            Ok(CallEvent::ParticipantsChanged(snapshot)) => {
                let ids: Vec<_> = snapshot.iter().map(|p| p.identity.to_string()).collect();
                info!(participants = ?ids, "Participants changed");
            }
            Ok(CallEvent::LocalStateChanged(view)) => info!(
                audio_muted = view.audio_muted,
                video_muted = view.video_muted,
                sharing = view.is_screen_sharing,
                "Local media changed"
            ),
            Ok(CallEvent::Connection { state, reason }) => {
                info!(?state, ?reason, "Connection")
            }
            Ok(CallEvent::DurationTick(elapsed)) => debug!(secs = elapsed.as_secs(), "Tick"),
            Ok(CallEvent::CallEnded(reason)) => info!(%reason, "Call ended"),
            Err(RecvError::Lagged(missed)) => warn!(missed, "Event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_call::{MembershipDirectory, SessionClient};
    use huddle_config::HuddleConfig;
    use std::sync::Arc;

    #[test]
    fn directory_names_every_peer() {
        let dir = directory(3);
        assert_eq!(dir.len(), 3);
        assert_eq!(
            dir.display_name(&ParticipantId::new("peer-2")).as_deref(),
            Some("Study buddy 2")
        );
    }

    #[tokio::test]
    async fn scripted_call_leaves_cleanly() {
        let engine = Arc::new(LoopbackEngine::new());
        let mut config = HuddleConfig::default();
        config.engine.app_id = "test".into();
        let client = SessionClient::new(engine.clone(), config);
        let controller = CallController::new(client.clone());
        let args = Args {
            channel: "algebra".into(),
            identity: Some("ada".into()),
            config: None,
            log_level: None,
            duration_secs: 1,
            peers: 2,
            deny_devices: false,
        };

        run(&engine, &controller, &args).await.unwrap();

        assert!(!client.is_joined());
        assert_eq!(client.media().held_tracks(), 0);
        assert_eq!(engine.join_calls(), 1);
        assert_eq!(engine.leave_calls(), 1);
    }
}

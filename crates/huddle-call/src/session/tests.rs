use std::sync::Arc;
use std::time::Duration;

use huddle_common::{CallError, MediaError, ParticipantId};
use huddle_config::HuddleConfig;
use tokio::sync::broadcast;

use super::*;
use crate::events::CallEvent;
use crate::local::LocalStateView;
use crate::loopback::LoopbackEngine;
use crate::media::{ConnectionState, EngineError, MediaKind};
use crate::registry::ParticipantSnapshot;

fn config() -> HuddleConfig {
    let mut config = HuddleConfig::default();
    config.engine.app_id = "study-app".into();
    config.call.join_wait_timeout_ms = 200;
    config.call.acquisition_timeout_ms = 1000;
    config
}

fn setup() -> (Arc<LoopbackEngine>, Arc<SessionClient>) {
    let engine = Arc::new(LoopbackEngine::new());
    let client = SessionClient::new(engine.clone(), config());
    (engine, client)
}

fn drain(rx: &mut broadcast::Receiver<CallEvent>) -> Vec<CallEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn next_participants(rx: &mut broadcast::Receiver<CallEvent>) -> ParticipantSnapshot {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(CallEvent::ParticipantsChanged(snapshot)) = rx.recv().await {
                return snapshot;
            }
        }
    })
    .await
    .expect("no participant update")
}

// -- join serialization ----------------------------------------------------

#[tokio::test]
async fn second_join_times_out_while_first_is_held() {
    let (engine, client) = setup();
    engine.hold_joins();

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.join_channel("algebra", None).await })
    };
    engine.join_started().await;

    let second = client.join_channel("algebra", None).await;
    assert_eq!(second, Err(CallError::JoinTimeout(Duration::from_millis(200))));

    engine.release_joins();
    let identity = first.await.unwrap().unwrap();
    assert_eq!(engine.join_calls(), 1);
    assert_eq!(engine.max_joins_in_flight(), 1);
    assert!(client.is_joined());

    // a later caller gets the established identity without a second join
    let again = client.join_channel("algebra", None).await.unwrap();
    assert_eq!(again, identity);
    assert_eq!(engine.join_calls(), 1);
}

#[tokio::test]
async fn concurrent_joins_share_the_first_result() {
    let (engine, client) = setup();
    engine.set_join_delay(Duration::from_millis(30));

    let (a, b) = tokio::join!(
        client.join_channel("algebra", None),
        client.join_channel("algebra", None)
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(engine.join_calls(), 1);
}

#[tokio::test]
async fn queued_join_shares_the_first_failure() {
    let (engine, client) = setup();
    engine.hold_joins();
    engine.fail_next_join(EngineError::Transport("down".into()));

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.join_channel("algebra", None).await })
    };
    engine.join_started().await;
    let second = {
        let client = client.clone();
        tokio::spawn(async move { client.join_channel("algebra", None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.release_joins();

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(matches!(first, Err(CallError::Network(_))));
    assert_eq!(second, first);
    assert_eq!(engine.join_calls(), 1);
    assert!(client.session().is_none());

    // A later, unqueued attempt joins normally.
    client.join_channel("algebra", None).await.unwrap();
    assert_eq!(engine.join_calls(), 2);
}

#[tokio::test]
async fn joining_a_different_channel_is_rejected() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();

    let err = client.join_channel("biology", None).await.unwrap_err();
    assert!(matches!(err, CallError::InvalidArgument(_)));
    assert_eq!(client.session().unwrap().channel_name, "algebra");
    assert_eq!(engine.leave_calls(), 0);
}

#[tokio::test]
async fn empty_channel_name_is_invalid() {
    let (engine, client) = setup();
    let err = client.join_channel("   ", None).await.unwrap_err();
    assert!(matches!(err, CallError::InvalidArgument(_)));
    assert_eq!(engine.join_calls(), 0);
}

#[tokio::test]
async fn missing_app_id_is_a_configuration_error() {
    let engine = Arc::new(LoopbackEngine::new());
    let mut config = config();
    config.engine.app_id.clear();
    let client = SessionClient::new(engine.clone(), config);

    let err = client.join_channel("algebra", None).await.unwrap_err();
    assert!(matches!(err, CallError::Configuration(_)));
    assert_eq!(engine.join_calls(), 0);
}

#[tokio::test]
async fn init_is_idempotent() {
    let (_engine, client) = setup();
    client.init().await.unwrap();
    client.init().await.unwrap();
}

#[tokio::test]
async fn engine_may_assign_a_different_identity() {
    let (engine, client) = setup();
    engine.assign_identity("77");

    let identity = client
        .join_channel("algebra", Some(ParticipantId::new("alice")))
        .await
        .unwrap();

    assert_eq!(identity, ParticipantId::new("77"));
    let session = client.session().unwrap();
    assert_eq!(session.local_identity, Some(identity));
    assert_eq!(session.state, SessionState::Joined);
    assert!(session.started_at.is_some());
}

// -- join failures ---------------------------------------------------------

#[tokio::test]
async fn permission_denied_joins_without_media() {
    let (engine, client) = setup();
    engine.deny_devices(MediaError::PermissionDenied("blocked".into()));
    let mut rx = client.subscribe();

    client.join_channel("algebra", None).await.unwrap();

    assert!(client.is_joined());
    assert!(engine.published_kinds().is_empty());
    assert_eq!(engine.publish_calls(), 0);
    let expected = LocalStateView {
        audio_muted: true,
        video_muted: true,
        is_screen_sharing: false,
    };
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, CallEvent::LocalStateChanged(view) if *view == expected)));
}

#[tokio::test]
async fn missing_camera_falls_back_to_microphone() {
    let (engine, client) = setup();
    engine.fail_camera(MediaError::DeviceUnavailable("no camera".into()));

    client.join_channel("algebra", None).await.unwrap();

    assert_eq!(engine.published_kinds(), vec![MediaKind::Audio]);
    let view = client.local_state();
    assert!(!view.audio_muted);
    assert!(view.video_muted);
}

#[tokio::test]
async fn network_failure_cleans_up() {
    let (engine, client) = setup();
    engine.fail_next_join(EngineError::Transport("offline".into()));

    let err = client.join_channel("algebra", None).await.unwrap_err();

    assert!(matches!(err, CallError::Network(_)));
    assert!(err.is_retryable());
    assert!(client.session().is_none());
    assert_eq!(client.media().held_tracks(), 0);
    assert_eq!(engine.leave_calls(), 1);
}

#[tokio::test]
async fn publish_failure_releases_tracks() {
    let (engine, client) = setup();
    engine.fail_next_publish(EngineError::Rejected("quota".into()));

    let err = client.join_channel("algebra", None).await.unwrap_err();

    assert!(matches!(err, CallError::Network(_)));
    assert!(!client.is_joined());
    assert_eq!(client.media().held_tracks(), 0);
    assert!(!engine.is_joined());
}

#[tokio::test]
async fn leave_during_acquisition_supersedes_join() {
    let (engine, client) = setup();
    engine.hold_acquisitions();

    let join = {
        let client = client.clone();
        tokio::spawn(async move { client.join_channel("algebra", None).await })
    };
    engine.acquisition_started().await;

    let leave = {
        let client = client.clone();
        tokio::spawn(async move { client.leave_channel().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.release_acquisitions();

    assert_eq!(join.await.unwrap(), Err(CallError::Superseded));
    assert!(leave.await.unwrap());
    assert_eq!(engine.publish_calls(), 0);
    assert_eq!(engine.leave_calls(), 1);
    assert_eq!(client.media().held_tracks(), 0);
    assert!(client.session().is_none());
}

#[tokio::test]
async fn start_muted_preferences_apply_after_publish() {
    let engine = Arc::new(LoopbackEngine::new());
    let mut config = config();
    config.media.start_audio_muted = true;
    let client = SessionClient::new(engine.clone(), config);

    client.join_channel("algebra", None).await.unwrap();

    assert_eq!(engine.published_kinds(), vec![MediaKind::Audio, MediaKind::Video]);
    let view = client.local_state();
    assert!(view.audio_muted);
    assert!(!view.video_muted);
}

// -- leave -----------------------------------------------------------------

#[tokio::test]
async fn leave_without_join_is_a_noop() {
    let (engine, client) = setup();
    assert!(!client.leave_channel().await);
    assert_eq!(engine.leave_calls(), 0);
}

#[tokio::test]
async fn leave_releases_everything() {
    let (engine, client) = setup();
    let mut rx = client.subscribe();
    client.join_channel("algebra", None).await.unwrap();
    engine.publish_remote("bob", MediaKind::Video);
    assert_eq!(next_participants(&mut rx).await.len(), 1);

    assert!(client.leave_channel().await);

    assert!(client.participants().await.is_empty());
    assert_eq!(client.media().held_tracks(), 0);
    assert!(!engine.is_joined());
    assert!(!client.leave_channel().await);
    assert_eq!(engine.leave_calls(), 1);
}

#[tokio::test]
async fn rejoin_after_leave() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    client.leave_channel().await;

    client.join_channel("biology", None).await.unwrap();

    assert_eq!(engine.join_calls(), 2);
    assert_eq!(client.session().unwrap().channel_name, "biology");
}

// -- toggles ---------------------------------------------------------------

#[tokio::test]
async fn toggles_report_liveness() {
    let (_engine, client) = setup();
    assert!(!client.toggle_audio());

    client.join_channel("algebra", None).await.unwrap();

    assert!(!client.toggle_audio());
    assert!(client.local_state().audio_muted);
    assert!(client.toggle_audio());
    assert!(!client.local_state().audio_muted);

    assert!(!client.toggle_video());
    assert!(client.local_state().video_muted);
}

// -- screen share ----------------------------------------------------------

#[tokio::test]
async fn screen_share_keeps_one_video_track_published() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    assert_eq!(engine.published_video_slot_tracks(), 1);

    client.start_screen_share().await.unwrap();
    assert_eq!(engine.published_video_slot_tracks(), 1);
    assert!(engine.published_kinds().contains(&MediaKind::Screen));
    assert!(client.local_state().is_screen_sharing);

    // second start is a no-op
    client.start_screen_share().await.unwrap();
    assert_eq!(engine.published_video_slot_tracks(), 1);

    client.stop_screen_share().await.unwrap();
    assert_eq!(engine.published_video_slot_tracks(), 1);
    assert!(engine.published_kinds().contains(&MediaKind::Video));
    assert!(!client.local_state().is_screen_sharing);
    assert_eq!(client.media().held_tracks(), 2);
}

#[tokio::test]
async fn screen_share_requires_a_session() {
    let (_engine, client) = setup();
    assert_eq!(client.start_screen_share().await, Err(CallError::NotJoined));
    assert_eq!(client.stop_screen_share().await, Err(CallError::NotJoined));
}

#[tokio::test]
async fn dismissed_picker_leaves_camera_alone() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    engine.fail_screen(MediaError::UserCancelled);

    let err = client.start_screen_share().await.unwrap_err();

    assert_eq!(err, CallError::Media(MediaError::UserCancelled));
    assert_eq!(engine.published_kinds(), vec![MediaKind::Audio, MediaKind::Video]);
    assert!(!client.local_state().video_muted);
    assert!(!client.local_state().is_screen_sharing);
}

#[tokio::test]
async fn screen_acquisition_failure_is_recoverable() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    engine.fail_screen(MediaError::DeviceUnavailable("no display".into()));

    let err = client.start_screen_share().await.unwrap_err();
    assert!(matches!(err, CallError::Media(MediaError::DeviceUnavailable(_))));

    engine.clear_device_failures();
    client.start_screen_share().await.unwrap();
    assert!(client.local_state().is_screen_sharing);
}

#[tokio::test]
async fn stop_share_restores_muted_camera() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    client.toggle_video();

    client.start_screen_share().await.unwrap();
    client.stop_screen_share().await.unwrap();

    assert!(client.local_state().video_muted);
    assert!(engine.published_kinds().contains(&MediaKind::Video));
}

#[tokio::test]
async fn stop_share_without_camera_degrades() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    client.start_screen_share().await.unwrap();
    engine.fail_camera(MediaError::DeviceUnavailable("unplugged".into()));

    client.stop_screen_share().await.unwrap();

    assert!(client.local_state().video_muted);
    assert!(!client.local_state().is_screen_sharing);
    assert_eq!(engine.published_video_slot_tracks(), 0);
    assert_eq!(client.media().held_tracks(), 1);
}

// -- engine events ---------------------------------------------------------

#[tokio::test]
async fn remote_publish_reaches_registry() {
    let (engine, client) = setup();
    let mut rx = client.subscribe();
    client.join_channel("algebra", None).await.unwrap();

    engine.publish_remote("bob", MediaKind::Screen);
    let snapshot = next_participants(&mut rx).await;

    assert_eq!(snapshot[0].identity, ParticipantId::new("bob"));
    assert!(snapshot[0].has_screen);
    assert_eq!(
        client.screen_sharer().await.map(|p| p.identity),
        Some(ParticipantId::new("bob"))
    );
}

#[tokio::test]
async fn events_after_leave_are_discarded() {
    let (engine, client) = setup();
    client.join_channel("algebra", None).await.unwrap();
    client.leave_channel().await;

    engine.publish_remote("bob", MediaKind::Audio);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(client.participants().await.is_empty());
    assert_eq!(engine.subscribe_calls(), 0);
}

#[tokio::test]
async fn connection_changes_are_forwarded() {
    let (engine, client) = setup();
    let mut rx = client.subscribe();
    client.join_channel("algebra", None).await.unwrap();

    engine.drop_connection("network lost");

    let event = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(CallEvent::Connection {
                state: ConnectionState::Disconnected,
                reason,
            }) = rx.recv().await
            {
                return reason;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(event.as_deref(), Some("network lost"));
}

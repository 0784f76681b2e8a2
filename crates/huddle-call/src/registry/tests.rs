use huddle_common::{EventBus, ParticipantId};

use super::*;
use crate::events::CallEvent;
use crate::media::{MediaKind, RemoteTrack};

fn registry() -> (RemoteParticipantRegistry, EventBus<CallEvent>) {
    let bus = EventBus::new(64);
    (RemoteParticipantRegistry::new(bus.clone()), bus)
}

fn track(id: &str, kind: MediaKind) -> RemoteTrack {
    RemoteTrack {
        id: id.to_string(),
        kind,
    }
}

fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

#[tokio::test]
async fn first_publish_creates_entry() {
    let (registry, _) = registry();
    let snapshot = registry
        .on_published(&pid("7"), MediaKind::Audio, track("a", MediaKind::Audio))
        .await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].identity, pid("7"));
    assert!(snapshot[0].has_audio);
    assert!(!snapshot[0].has_video);
}

#[tokio::test]
async fn republish_replaces_track_without_duplicating() {
    let (registry, _) = registry();
    let id = pid("42");

    registry
        .on_published(&id, MediaKind::Video, track("v1", MediaKind::Video))
        .await;
    registry.on_unpublished(&id, MediaKind::Video).await;

    let muted = registry.get(&id).await.unwrap();
    assert!(!muted.has_video);
    assert!(muted.video_track.is_none());

    registry
        .on_published(&id, MediaKind::Video, track("v2", MediaKind::Video))
        .await;

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].has_video);
    assert_eq!(snapshot[0].video_track.as_ref().unwrap().id, "v2");
}

#[tokio::test]
async fn unpublish_for_unknown_participant_is_ignored() {
    let (registry, bus) = registry();
    let mut rx = bus.subscribe();

    registry.on_unpublished(&pid("ghost"), MediaKind::Audio).await;

    assert!(registry.is_empty().await);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn user_left_removes_entry_and_screen() {
    let (registry, _) = registry();
    let id = pid("9");
    registry
        .on_published(&id, MediaKind::Screen, track("s", MediaKind::Screen))
        .await;
    assert_eq!(registry.screen_sharer().await.unwrap().identity, id);

    registry.on_user_left(&id).await;

    assert!(registry.get(&id).await.is_none());
    assert!(registry.screen_sharer().await.is_none());
    assert_eq!(registry.len().await, 0);
}

#[tokio::test]
async fn first_sharer_renders_until_it_stops() {
    let (registry, _) = registry();
    let (a, b) = (pid("a"), pid("b"));

    registry
        .on_published(&a, MediaKind::Screen, track("sa", MediaKind::Screen))
        .await;
    registry
        .on_published(&b, MediaKind::Screen, track("sb", MediaKind::Screen))
        .await;
    assert_eq!(registry.screen_sharer().await.unwrap().identity, a);

    registry.on_unpublished(&a, MediaKind::Screen).await;
    assert_eq!(registry.screen_sharer().await.unwrap().identity, b);

    registry.on_unpublished(&b, MediaKind::Screen).await;
    assert!(registry.screen_sharer().await.is_none());
}

#[tokio::test]
async fn earlier_participant_takes_the_stage_when_it_shares() {
    let (registry, _) = registry();
    let (a, b) = (pid("a"), pid("b"));

    // b joins first as a camera-only participant
    registry
        .on_published(&b, MediaKind::Video, track("vb", MediaKind::Video))
        .await;
    registry
        .on_published(&a, MediaKind::Screen, track("sa", MediaKind::Screen))
        .await;
    registry
        .on_published(&b, MediaKind::Screen, track("sb", MediaKind::Screen))
        .await;
    assert_eq!(registry.screen_sharer().await.unwrap().identity, b);

    registry.on_unpublished(&b, MediaKind::Screen).await;
    assert_eq!(registry.screen_sharer().await.unwrap().identity, a);
}

#[tokio::test]
async fn every_mutation_publishes_a_snapshot() {
    let (registry, bus) = registry();
    let mut rx = bus.subscribe();
    let id = pid("5");

    registry
        .on_published(&id, MediaKind::Audio, track("a", MediaKind::Audio))
        .await;
    registry.on_unpublished(&id, MediaKind::Audio).await;
    registry.on_user_left(&id).await;

    let mut sizes = Vec::new();
    while let Ok(CallEvent::ParticipantsChanged(snapshot)) = rx.try_recv() {
        sizes.push(snapshot.len());
    }
    assert_eq!(sizes, vec![1, 1, 0]);
}

#[tokio::test]
async fn clear_empties_and_fences_stale_subscriptions() {
    let (registry, _) = registry();
    let id = pid("3");
    registry
        .on_published(&id, MediaKind::Audio, track("a", MediaKind::Audio))
        .await;

    let epoch = registry.epoch().await;
    registry.clear().await;
    assert!(registry.is_empty().await);

    let kept = registry
        .on_published_in(epoch, &id, MediaKind::Video, track("v", MediaKind::Video))
        .await;
    assert!(!kept);
    assert!(registry.is_empty().await);

    let fresh = registry.epoch().await;
    assert!(
        registry
            .on_published_in(fresh, &id, MediaKind::Video, track("v", MediaKind::Video))
            .await
    );
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn clearing_an_empty_registry_is_silent() {
    let (registry, bus) = registry();
    let mut rx = bus.subscribe();

    registry.clear().await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn snapshots_keep_insertion_order() {
    let (registry, _) = registry();
    for id in ["c", "a", "b"] {
        registry
            .on_published(&pid(id), MediaKind::Audio, track(id, MediaKind::Audio))
            .await;
    }

    let order: Vec<_> = registry
        .snapshot()
        .await
        .iter()
        .map(|p| p.identity.as_str().to_string())
        .collect();
    assert_eq!(order, vec!["c", "a", "b"]);
}

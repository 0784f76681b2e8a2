//! Remote participant registry, fed by engine callbacks.

use huddle_common::{EventBus, ParticipantId};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::events::CallEvent;
use crate::media::{MediaKind, RemoteTrack};

use super::types::{ParticipantSnapshot, RemoteParticipant};

#[derive(Debug, Default)]
struct RegistryState {
    /// Insertion order decides which sharer renders first.
    entries: Vec<RemoteParticipant>,
    /// Remote participant whose screen is currently rendered.
    sharer: Option<ParticipantId>,
    /// Bumped by `clear`; subscriptions started before it are stale.
    epoch: u64,
}

impl RegistryState {
    fn position(&self, identity: &ParticipantId) -> Option<usize> {
        self.entries.iter().position(|p| &p.identity == identity)
    }

    fn snapshot(&self) -> ParticipantSnapshot {
        self.entries.iter().cloned().collect()
    }

    /// The earliest entry, by insertion order, that publishes a screen.
    fn reselect_sharer(&mut self) {
        let next = self
            .entries
            .iter()
            .find(|p| p.has_screen)
            .map(|p| p.identity.clone());
        if next != self.sharer {
            info!(
                from = ?self.sharer.as_ref().map(ParticipantId::as_str),
                to = ?next.as_ref().map(ParticipantId::as_str),
                "Rendered screen share changed"
            );
        }
        self.sharer = next;
    }
}

// ---------------------------------------------------------------------------
// Remote Participant Registry
// ---------------------------------------------------------------------------

/// Identity-keyed record of what each remote participant publishes.
///
/// Every mutation publishes [`CallEvent::ParticipantsChanged`] while the
/// write lock is still held, so subscribers observe snapshots in the same
/// order the mutations happened.
pub struct RemoteParticipantRegistry {
    state: RwLock<RegistryState>,
    events: EventBus<CallEvent>,
}

impl RemoteParticipantRegistry {
    pub fn new(events: EventBus<CallEvent>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            events,
        }
    }

    /// Record a subscribed track. Creates the entry on first sight and
    /// replaces any previous track of the same kind.
    pub async fn on_published(
        &self,
        identity: &ParticipantId,
        kind: MediaKind,
        track: RemoteTrack,
    ) -> ParticipantSnapshot {
        let mut state = self.state.write().await;
        self.apply_published(&mut state, identity, kind, track)
    }

    /// Like [`on_published`](Self::on_published), but only if no `clear`
    /// happened since `epoch` was read. Returns whether the track was kept.
    pub(crate) async fn on_published_in(
        &self,
        epoch: u64,
        identity: &ParticipantId,
        kind: MediaKind,
        track: RemoteTrack,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!(
                identity = identity.as_str(),
                %kind,
                "Dropping subscription that resolved after the registry was cleared"
            );
            return false;
        }
        self.apply_published(&mut state, identity, kind, track);
        true
    }

    /// Clear the flag and track for `kind`. The entry itself stays so a
    /// muted participant keeps their tile.
    pub async fn on_unpublished(&self, identity: &ParticipantId, kind: MediaKind) {
        let mut state = self.state.write().await;
        let Some(index) = state.position(identity) else {
            debug!(identity = identity.as_str(), %kind, "Unpublish for unknown participant");
            return;
        };
        state.entries[index].set_track(kind, None);
        if kind == MediaKind::Screen {
            state.reselect_sharer();
        }
        debug!(identity = identity.as_str(), %kind, "Remote track unpublished");
        self.publish_snapshot(&state);
    }

    /// Drop the participant entirely.
    pub async fn on_user_left(&self, identity: &ParticipantId) {
        let mut state = self.state.write().await;
        let Some(index) = state.position(identity) else {
            return;
        };
        state.entries.remove(index);
        state.reselect_sharer();
        info!(identity = identity.as_str(), "Remote participant left");
        self.publish_snapshot(&state);
    }

    /// Forget every participant. Subscriptions still in flight are
    /// rejected when they resolve.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.epoch += 1;
        if state.entries.is_empty() {
            return;
        }
        let count = state.entries.len();
        state.entries.clear();
        state.sharer = None;
        info!(count, "Remote participants cleared");
        self.publish_snapshot(&state);
    }

    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    pub async fn snapshot(&self) -> ParticipantSnapshot {
        self.state.read().await.snapshot()
    }

    /// The single remote screen share to render, if any.
    pub async fn screen_sharer(&self) -> Option<RemoteParticipant> {
        let state = self.state.read().await;
        let sharer = state.sharer.as_ref()?;
        state.position(sharer).map(|i| state.entries[i].clone())
    }

    pub async fn get(&self, identity: &ParticipantId) -> Option<RemoteParticipant> {
        let state = self.state.read().await;
        state.position(identity).map(|i| state.entries[i].clone())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    fn apply_published(
        &self,
        state: &mut RegistryState,
        identity: &ParticipantId,
        kind: MediaKind,
        track: RemoteTrack,
    ) -> ParticipantSnapshot {
        let index = match state.position(identity) {
            Some(index) => index,
            None => {
                info!(identity = identity.as_str(), "Remote participant joined");
                state.entries.push(RemoteParticipant::new(identity.clone()));
                state.entries.len() - 1
            }
        };
        debug!(identity = identity.as_str(), %kind, track = %track.id, "Remote track subscribed");
        state.entries[index].set_track(kind, Some(track));
        if kind == MediaKind::Screen {
            state.reselect_sharer();
        }
        self.publish_snapshot(state)
    }

    fn publish_snapshot(&self, state: &RegistryState) -> ParticipantSnapshot {
        let snapshot = state.snapshot();
        self.events
            .publish(CallEvent::ParticipantsChanged(snapshot.clone()));
        snapshot
    }
}

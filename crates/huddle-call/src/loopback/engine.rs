//! In-process [`MediaEngine`] with scriptable failures and latches.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use huddle_common::{MediaError, ParticipantId};
use huddle_config::schema::{ScreenQuality, VideoQuality};
use tokio::sync::{mpsc, watch, Notify};
use tracing::debug;

use crate::media::{
    ConnectionState, EngineError, EngineEvent, EngineEvents, LocalTrackRef, MediaEngine,
    MediaKind, RemoteTrack,
};

use super::track::LoopbackTrack;

#[derive(Default)]
struct LoopbackState {
    channel: Option<String>,
    identity: Option<ParticipantId>,
    assigned_identity: Option<ParticipantId>,
    published: Vec<LocalTrackRef>,
    next_track: u64,
    next_identity: u64,

    join_calls: usize,
    joins_in_flight: usize,
    max_joins_in_flight: usize,
    leave_calls: usize,
    publish_calls: usize,
    subscribe_calls: usize,

    join_delay: Duration,
    acquisition_delay: Duration,
    join_failure: Option<EngineError>,
    publish_failure: Option<EngineError>,
    device_failure: Option<MediaError>,
    camera_failure: Option<MediaError>,
    screen_failure: Option<MediaError>,
}

impl LoopbackState {
    fn new_track(&mut self, kind: MediaKind) -> LocalTrackRef {
        self.next_track += 1;
        Arc::new(LoopbackTrack::new(
            format!("{kind}-{}", self.next_track),
            kind,
        ))
    }
}

// ---------------------------------------------------------------------------
// Loopback Engine
// ---------------------------------------------------------------------------

/// A media engine that never leaves the process.
///
/// Joins always succeed unless a failure is scripted; remote participants
/// are simulated by injecting [`EngineEvent`]s. Latches let a caller hold
/// a join or a device acquisition open to exercise races.
pub struct LoopbackEngine {
    state: Mutex<LoopbackState>,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<EngineEvent>>>,
    join_latch: watch::Sender<bool>,
    acquisition_latch: watch::Sender<bool>,
    join_started: Notify,
    acquisition_started: Notify,
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackEngine {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            state: Mutex::new(LoopbackState::default()),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            join_latch: watch::channel(false).0,
            acquisition_latch: watch::channel(false).0,
            join_started: Notify::new(),
            acquisition_started: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- remote simulation --------------------------------------------------

    /// Deliver an engine callback to whoever initialized the engine.
    pub fn emit(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            debug!("loopback event dropped (no listener or queue full)");
        }
    }

    pub fn publish_remote(&self, identity: &str, kind: MediaKind) {
        self.emit(EngineEvent::UserPublished {
            identity: identity.into(),
            kind,
        });
    }

    pub fn unpublish_remote(&self, identity: &str, kind: MediaKind) {
        self.emit(EngineEvent::UserUnpublished {
            identity: identity.into(),
            kind,
        });
    }

    pub fn remove_remote(&self, identity: &str) {
        self.emit(EngineEvent::UserLeft {
            identity: identity.into(),
        });
    }

    /// Simulate the network dropping the session.
    pub fn drop_connection(&self, reason: &str) {
        self.lock().channel = None;
        self.emit(EngineEvent::ConnectionStateChanged {
            state: ConnectionState::Disconnected,
            reason: Some(reason.to_string()),
        });
    }

    // -- scripting ----------------------------------------------------------

    pub fn set_join_delay(&self, delay: Duration) {
        self.lock().join_delay = delay;
    }

    pub fn set_acquisition_delay(&self, delay: Duration) {
        self.lock().acquisition_delay = delay;
    }

    /// Ignore the caller's preferred identity and hand out `identity`.
    pub fn assign_identity(&self, identity: &str) {
        self.lock().assigned_identity = Some(identity.into());
    }

    pub fn fail_next_join(&self, error: EngineError) {
        self.lock().join_failure = Some(error);
    }

    pub fn fail_next_publish(&self, error: EngineError) {
        self.lock().publish_failure = Some(error);
    }

    /// Every microphone/camera acquisition fails with `error`.
    pub fn deny_devices(&self, error: MediaError) {
        self.lock().device_failure = Some(error);
    }

    /// Camera acquisitions fail with `error`; the microphone still works.
    pub fn fail_camera(&self, error: MediaError) {
        self.lock().camera_failure = Some(error);
    }

    pub fn fail_screen(&self, error: MediaError) {
        self.lock().screen_failure = Some(error);
    }

    pub fn clear_device_failures(&self) {
        let mut state = self.lock();
        state.device_failure = None;
        state.camera_failure = None;
        state.screen_failure = None;
    }

    /// Park every join until [`release_joins`](Self::release_joins).
    pub fn hold_joins(&self) {
        self.join_latch.send_replace(true);
    }

    pub fn release_joins(&self) {
        self.join_latch.send_replace(false);
    }

    /// Park every device acquisition until [`release_acquisitions`](Self::release_acquisitions).
    pub fn hold_acquisitions(&self) {
        self.acquisition_latch.send_replace(true);
    }

    pub fn release_acquisitions(&self) {
        self.acquisition_latch.send_replace(false);
    }

    /// Resolves once a join has reached the engine.
    pub async fn join_started(&self) {
        self.join_started.notified().await;
    }

    /// Resolves once a device acquisition has reached the engine.
    pub async fn acquisition_started(&self) {
        self.acquisition_started.notified().await;
    }

    // -- observation --------------------------------------------------------

    pub fn join_calls(&self) -> usize {
        self.lock().join_calls
    }

    /// Highest number of joins that were ever inside the engine at once.
    pub fn max_joins_in_flight(&self) -> usize {
        self.lock().max_joins_in_flight
    }

    pub fn leave_calls(&self) -> usize {
        self.lock().leave_calls
    }

    pub fn publish_calls(&self) -> usize {
        self.lock().publish_calls
    }

    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    pub fn is_joined(&self) -> bool {
        self.lock().channel.is_some()
    }

    /// Kinds of the tracks currently published, in publish order.
    pub fn published_kinds(&self) -> Vec<MediaKind> {
        self.lock().published.iter().map(|t| t.kind()).collect()
    }

    pub fn published_video_slot_tracks(&self) -> usize {
        self.lock()
            .published
            .iter()
            .filter(|t| t.kind().occupies_video_slot())
            .count()
    }

    async fn pass_latch(latch: &watch::Sender<bool>) {
        let mut rx = latch.subscribe();
        let _ = rx.wait_for(|held| !*held).await;
    }

    async fn before_acquisition(&self) {
        self.acquisition_started.notify_one();
        Self::pass_latch(&self.acquisition_latch).await;
        let delay = self.lock().acquisition_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MediaEngine for LoopbackEngine {
    async fn initialize(&self) -> Result<EngineEvents, EngineError> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| EngineError::Rejected("engine already initialized".into()))
    }

    async fn join(
        &self,
        _app_id: &str,
        channel: &str,
        _token: Option<&str>,
        identity: Option<&ParticipantId>,
    ) -> Result<ParticipantId, EngineError> {
        {
            let mut state = self.lock();
            state.join_calls += 1;
            state.joins_in_flight += 1;
            state.max_joins_in_flight = state.max_joins_in_flight.max(state.joins_in_flight);
        }
        self.join_started.notify_one();
        Self::pass_latch(&self.join_latch).await;
        let delay = self.lock().join_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let assigned = {
            let mut state = self.lock();
            state.joins_in_flight -= 1;
            if let Some(e) = state.join_failure.take() {
                return Err(e);
            }
            if state.channel.is_some() {
                return Err(EngineError::Rejected("already in a channel".into()));
            }
            let assigned = match (state.assigned_identity.clone(), identity) {
                (Some(forced), _) => forced,
                (None, Some(preferred)) => preferred.clone(),
                (None, None) => {
                    state.next_identity += 1;
                    ParticipantId::new(format!("{}", 1000 + state.next_identity))
                }
            };
            state.channel = Some(channel.to_string());
            state.identity = Some(assigned.clone());
            assigned
        };

        self.emit(EngineEvent::ConnectionStateChanged {
            state: ConnectionState::Connected,
            reason: None,
        });
        Ok(assigned)
    }

    async fn leave(&self) -> Result<(), EngineError> {
        {
            let mut state = self.lock();
            state.leave_calls += 1;
            state.channel = None;
            state.identity = None;
            state.published.clear();
        }
        self.emit(EngineEvent::ConnectionStateChanged {
            state: ConnectionState::Disconnected,
            reason: None,
        });
        Ok(())
    }

    async fn publish(&self, tracks: &[LocalTrackRef]) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.channel.is_none() {
            return Err(EngineError::NotConnected);
        }
        if let Some(e) = state.publish_failure.take() {
            return Err(e);
        }
        state.publish_calls += 1;
        for track in tracks {
            if !state.published.iter().any(|p| p.id() == track.id()) {
                state.published.push(Arc::clone(track));
            }
        }
        Ok(())
    }

    async fn unpublish(&self, tracks: &[LocalTrackRef]) -> Result<(), EngineError> {
        let mut state = self.lock();
        state
            .published
            .retain(|p| !tracks.iter().any(|t| t.id() == p.id()));
        Ok(())
    }

    async fn subscribe(
        &self,
        participant: &ParticipantId,
        kind: MediaKind,
    ) -> Result<RemoteTrack, EngineError> {
        let mut state = self.lock();
        if state.channel.is_none() {
            return Err(EngineError::NotConnected);
        }
        state.subscribe_calls += 1;
        Ok(RemoteTrack {
            id: format!("{participant}-{kind}-{}", state.subscribe_calls),
            kind,
        })
    }

    async fn unsubscribe(
        &self,
        _participant: &ParticipantId,
        _kind: MediaKind,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn create_microphone_and_camera_tracks(
        &self,
        _quality: VideoQuality,
    ) -> Result<(LocalTrackRef, LocalTrackRef), MediaError> {
        self.before_acquisition().await;
        let mut state = self.lock();
        if let Some(e) = state.device_failure.clone().or(state.camera_failure.clone()) {
            return Err(e);
        }
        let audio = state.new_track(MediaKind::Audio);
        let video = state.new_track(MediaKind::Video);
        Ok((audio, video))
    }

    async fn create_microphone_track(&self) -> Result<LocalTrackRef, MediaError> {
        self.before_acquisition().await;
        let mut state = self.lock();
        if let Some(e) = state.device_failure.clone() {
            return Err(e);
        }
        Ok(state.new_track(MediaKind::Audio))
    }

    async fn create_camera_track(&self, _quality: VideoQuality) -> Result<LocalTrackRef, MediaError> {
        self.before_acquisition().await;
        let mut state = self.lock();
        if let Some(e) = state.device_failure.clone().or(state.camera_failure.clone()) {
            return Err(e);
        }
        Ok(state.new_track(MediaKind::Video))
    }

    async fn create_screen_track(&self, _quality: ScreenQuality) -> Result<LocalTrackRef, MediaError> {
        self.before_acquisition().await;
        let mut state = self.lock();
        if let Some(e) = state.screen_failure.clone() {
            return Err(e);
        }
        Ok(state.new_track(MediaKind::Screen))
    }
}

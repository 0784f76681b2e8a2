//! Session client: join, leave, publish, toggle, and screen share.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use huddle_common::{CallError, EventBus, MediaError, ParticipantId};
use huddle_config::HuddleConfig;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::CallEvent;
use crate::local::{LocalMediaManager, LocalMediaState, LocalStateView};
use crate::media::{LocalTrackRef, MediaEngine, MediaKind};
use crate::registry::{ParticipantSnapshot, RemoteParticipant, RemoteParticipantRegistry};

use super::pump;
use super::types::{CallSession, SessionState};

const EVENT_CAPACITY: usize = 256;

/// Session and local media, always changed together.
#[derive(Debug, Default)]
pub(super) struct ClientState {
    pub(super) session: Option<CallSession>,
    pub(super) local: LocalMediaState,
    joins: JoinLedger,
}

/// Hands the failure of a join to the callers that queued behind it.
#[derive(Debug, Default)]
struct JoinLedger {
    arrivals: u64,
    /// Ticket of the failed join, arrivals when it finished, and the error.
    last_failure: Option<(u64, u64, CallError)>,
}

impl JoinLedger {
    fn arrive(&mut self) -> u64 {
        self.arrivals += 1;
        self.arrivals
    }

    fn finish(&mut self, ticket: u64, outcome: &Result<ParticipantId, CallError>) {
        self.last_failure = match outcome {
            Err(e) if *e != CallError::Superseded => Some((ticket, self.arrivals, e.clone())),
            _ => None,
        };
    }

    /// The failure of a join that was in flight when `ticket` arrived.
    fn failure_seen_by(&self, ticket: u64) -> Option<CallError> {
        let (started, finished, error) = self.last_failure.as_ref()?;
        (*started < ticket && ticket <= *finished).then(|| error.clone())
    }
}

// ---------------------------------------------------------------------------
// Session Client
// ---------------------------------------------------------------------------

/// Drives one call session against a [`MediaEngine`].
///
/// Joins are serialized by a gate with a bounded wait. A leave bumps the
/// join generation so an in-flight join notices at its next checkpoint,
/// cleans up after itself, and reports [`CallError::Superseded`].
pub struct SessionClient {
    engine: Arc<dyn MediaEngine>,
    config: HuddleConfig,
    media: LocalMediaManager,
    registry: Arc<RemoteParticipantRegistry>,
    events: EventBus<CallEvent>,
    state: Mutex<ClientState>,
    /// Held for the whole of a join; a leave waits on it too.
    join_gate: AsyncMutex<()>,
    /// Serializes screen-share swaps with cleanup.
    media_gate: AsyncMutex<()>,
    generation: AtomicU64,
    pump: AsyncMutex<Option<JoinHandle<()>>>,
}

impl SessionClient {
    pub fn new(engine: Arc<dyn MediaEngine>, config: HuddleConfig) -> Arc<Self> {
        let events = EventBus::new(EVENT_CAPACITY);
        let media = LocalMediaManager::new(engine.clone(), config.call.acquisition_timeout());
        let registry = Arc::new(RemoteParticipantRegistry::new(events.clone()));
        Arc::new(Self {
            engine,
            config,
            media,
            registry,
            events,
            state: Mutex::new(ClientState::default()),
            join_gate: AsyncMutex::new(()),
            media_gate: AsyncMutex::new(()),
            generation: AtomicU64::new(0),
            pump: AsyncMutex::new(None),
        })
    }

    /// Initialize the engine and start the event pump. Safe to call again.
    pub async fn init(self: &Arc<Self>) -> Result<(), CallError> {
        if self.config.engine.app_id.trim().is_empty() {
            return Err(CallError::Configuration("engine.app_id is not set".into()));
        }

        let mut pump = self.pump.lock().await;
        if pump.is_some() {
            return Ok(());
        }
        let events = self
            .engine
            .initialize()
            .await
            .map_err(|e| CallError::Configuration(format!("engine initialization failed: {e}")))?;
        *pump = Some(pump::spawn(Arc::downgrade(self), events));
        info!("Media engine initialized");
        Ok(())
    }

    // -- join / leave -------------------------------------------------------

    /// Join `channel_name` and publish whatever local media can be opened.
    ///
    /// Returns the identity the engine assigned.
    pub async fn join_channel(
        self: &Arc<Self>,
        channel_name: &str,
        preferred_identity: Option<ParticipantId>,
    ) -> Result<ParticipantId, CallError> {
        let channel = channel_name.trim();
        if channel.is_empty() {
            return Err(CallError::InvalidArgument("channel name is empty".into()));
        }
        self.init().await?;

        let generation = self.generation.load(Ordering::SeqCst);
        let ticket = self.lock().joins.arrive();
        let wait = self.config.call.join_wait_timeout();
        let _gate = tokio::time::timeout(wait, self.join_gate.lock())
            .await
            .map_err(|_| {
                warn!(channel, wait_ms = wait.as_millis() as u64, "Join gate busy");
                CallError::JoinTimeout(wait)
            })?;
        self.checkpoint(generation)?;

        if let Some(e) = self.lock().joins.failure_seen_by(ticket) {
            debug!(channel, error = %e, "Queued join shares the failed join's result");
            return Err(e);
        }

        if let Some(existing) = self.joined_session() {
            return match existing.local_identity {
                Some(identity) if existing.channel_name == channel => {
                    debug!(channel, identity = identity.as_str(), "Already joined");
                    Ok(identity)
                }
                _ => Err(CallError::InvalidArgument(format!(
                    "already joined to channel '{}'",
                    existing.channel_name
                ))),
            };
        }

        let session = CallSession::joining(channel);
        let session_id = session.session_id.clone();
        self.lock().session = Some(session);
        info!(session = %session_id, channel, "Joining channel");

        let outcome = self
            .run_join(channel, preferred_identity.as_ref(), generation)
            .await;
        self.lock().joins.finish(ticket, &outcome);

        match outcome {
            Ok(identity) => {
                info!(
                    session = %session_id,
                    channel,
                    identity = identity.as_str(),
                    "Joined channel"
                );
                Ok(identity)
            }
            Err(e) => {
                if e == CallError::Superseded {
                    info!(session = %session_id, channel, "Join superseded by leave");
                } else {
                    warn!(session = %session_id, channel, error = %e, "Join failed");
                }
                self.cleanup().await;
                Err(e)
            }
        }
    }

    async fn run_join(
        &self,
        channel: &str,
        preferred_identity: Option<&ParticipantId>,
        generation: u64,
    ) -> Result<ParticipantId, CallError> {
        let join_timeout = self.config.call.join_timeout();
        let identity = tokio::time::timeout(
            join_timeout,
            self.engine.join(
                &self.config.engine.app_id,
                channel,
                self.config.engine.token(),
                preferred_identity,
            ),
        )
        .await
        .map_err(|_| {
            CallError::Network(format!(
                "join did not complete within {}ms",
                join_timeout.as_millis()
            ))
        })??;
        self.checkpoint(generation)?;

        if let Some(session) = self.lock().session.as_mut() {
            session.local_identity = Some(identity.clone());
        }

        let (audio, video) = self.acquire_local_tracks().await;
        {
            let mut state = self.lock();
            state.local.audio_track = audio.clone();
            state.local.video_track = video.clone();
        }
        self.checkpoint(generation)?;

        let tracks: Vec<LocalTrackRef> = audio.iter().chain(video.iter()).cloned().collect();
        if tracks.is_empty() {
            info!("No local media to publish");
        } else {
            self.engine.publish(&tracks).await?;
        }

        if self.config.media.start_audio_muted {
            if let Some(audio) = &audio {
                audio.set_enabled(false);
            }
        }
        if self.config.media.start_video_muted {
            if let Some(video) = &video {
                video.set_enabled(false);
            }
        }
        self.checkpoint(generation)?;

        let view = {
            let mut state = self.lock();
            state.local.sync_flags();
            if let Some(session) = state.session.as_mut() {
                session.state = SessionState::Joined;
                session.started_at = Some(Utc::now());
            }
            state.local.view()
        };
        self.events.publish(CallEvent::LocalStateChanged(view));
        Ok(identity)
    }

    /// Open microphone and camera, degrading to microphone only or to no
    /// local media at all. Never fails the join.
    async fn acquire_local_tracks(&self) -> (Option<LocalTrackRef>, Option<LocalTrackRef>) {
        let quality = self.config.media.video_quality;
        match self.media.acquire_audio_video(quality).await {
            Ok(tracks) => (Some(tracks.audio), Some(tracks.video)),
            Err(MediaError::DeviceUnavailable(reason)) => {
                warn!(%reason, "Camera unavailable, falling back to microphone only");
                match self.media.acquire_microphone().await {
                    Ok(audio) => (Some(audio), None),
                    Err(e) => {
                        warn!(error = %e, "Continuing without local media");
                        (None, None)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Continuing without local media");
                (None, None)
            }
        }
    }

    /// Leave the current session. Returns `false` when there was nothing
    /// to leave. Never fails.
    pub async fn leave_channel(&self) -> bool {
        self.cancel_pending_join();
        let had_session = self.lock().session.is_some();

        let _gate = self.join_gate.lock().await;
        let active = self.lock().session.is_some();
        if active {
            self.cleanup().await;
        }
        if had_session || active {
            info!("Left channel");
        } else {
            debug!("Leave requested with no session");
        }
        had_session || active
    }

    /// Mark every in-flight join as superseded.
    pub fn cancel_pending_join(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Release local tracks, leave the network session, then forget the
    /// remote participants. Errors are logged, never returned.
    async fn cleanup(&self) {
        let _media = self.media_gate.lock().await;

        let tracks = {
            let mut state = self.lock();
            if let Some(session) = state.session.as_mut() {
                session.state = SessionState::Disconnected;
            }
            state.local.take_tracks()
        };
        for track in &tracks {
            self.media.release(track);
        }

        if let Err(e) = self.engine.leave().await {
            warn!(error = %e, "Engine leave failed");
        }
        self.registry.clear().await;

        let view = {
            let mut state = self.lock();
            state.session = None;
            state.local.view()
        };
        self.events.publish(CallEvent::LocalStateChanged(view));
        debug!(released = tracks.len(), "Session cleaned up");
    }

    fn checkpoint(&self, generation: u64) -> Result<(), CallError> {
        if self.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            Err(CallError::Superseded)
        }
    }

    /// Leave and stop the event pump. The client cannot be joined again.
    pub async fn shutdown(&self) {
        self.leave_channel().await;
        if let Some(pump) = self.pump.lock().await.as_ref() {
            pump.abort();
        }
        info!("Session client shut down");
    }

    // -- toggles ------------------------------------------------------------

    /// Mute or unmute the microphone. Returns whether it is now live.
    pub fn toggle_audio(&self) -> bool {
        self.toggle(MediaKind::Audio)
    }

    /// Mute or unmute the camera. Returns whether it is now live.
    pub fn toggle_video(&self) -> bool {
        self.toggle(MediaKind::Video)
    }

    fn toggle(&self, kind: MediaKind) -> bool {
        let (live, view) = {
            let mut state = self.lock();
            let track = match kind {
                MediaKind::Audio => state.local.audio_track.clone(),
                _ => state.local.video_track.clone(),
            };
            let Some(track) = track else {
                debug!(%kind, "Toggle ignored, no track");
                return false;
            };
            let live = !track.is_enabled();
            track.set_enabled(live);
            state.local.sync_flags();
            (live, state.local.view())
        };
        info!(%kind, live, "Local track toggled");
        self.events.publish(CallEvent::LocalStateChanged(view));
        live
    }

    // -- screen share -------------------------------------------------------

    /// Replace the camera with a screen capture in the video slot.
    pub async fn start_screen_share(&self) -> Result<(), CallError> {
        let _media = self.media_gate.lock().await;
        {
            let state = self.lock();
            if !is_joined(&state) {
                return Err(CallError::NotJoined);
            }
            if state.local.is_screen_sharing {
                debug!("Already screen sharing");
                return Ok(());
            }
        }

        let screen = self
            .media
            .acquire_screen(self.config.media.screen_quality)
            .await?;

        let camera = {
            let mut state = self.lock();
            state.local.resume_camera_muted = state.local.video_muted;
            state.local.video_track.take()
        };
        if let Some(camera) = &camera {
            if let Err(e) = self.engine.unpublish(std::slice::from_ref(camera)).await {
                warn!(error = %e, "Camera unpublish failed");
            }
            self.media.release(camera);
        }

        if let Err(e) = self.engine.publish(std::slice::from_ref(&screen)).await {
            warn!(error = %e, "Screen publish failed, restoring camera");
            self.media.release(&screen);
            let resume_muted = self.lock().local.resume_camera_muted;
            self.restore_camera(resume_muted).await;
            self.publish_local_state();
            return Err(e.into());
        }

        self.lock().local.screen_track = Some(screen);
        info!("Screen share started");
        self.publish_local_state();
        Ok(())
    }

    /// Put the camera back in the video slot. A missing camera leaves the
    /// call without video rather than failing.
    pub async fn stop_screen_share(&self) -> Result<(), CallError> {
        let _media = self.media_gate.lock().await;
        let (screen, resume_muted) = {
            let mut state = self.lock();
            if !is_joined(&state) {
                return Err(CallError::NotJoined);
            }
            let Some(screen) = state.local.screen_track.take() else {
                debug!("Not screen sharing");
                return Ok(());
            };
            (screen, state.local.resume_camera_muted)
        };

        if let Err(e) = self.engine.unpublish(std::slice::from_ref(&screen)).await {
            warn!(error = %e, "Screen unpublish failed");
        }
        self.media.release(&screen);
        self.restore_camera(resume_muted).await;

        info!("Screen share stopped");
        self.publish_local_state();
        Ok(())
    }

    async fn restore_camera(&self, muted: bool) {
        let camera = match self
            .media
            .acquire_camera(self.config.media.video_quality)
            .await
        {
            Ok(camera) => camera,
            Err(e) => {
                warn!(error = %e, "Camera unavailable, continuing without video");
                self.lock().local.sync_flags();
                return;
            }
        };
        if muted {
            camera.set_enabled(false);
        }
        if let Err(e) = self.engine.publish(std::slice::from_ref(&camera)).await {
            warn!(error = %e, "Camera publish failed, continuing without video");
            self.media.release(&camera);
            self.lock().local.sync_flags();
            return;
        }
        let mut state = self.lock();
        state.local.video_track = Some(camera);
        state.local.sync_flags();
    }

    // -- accessors ----------------------------------------------------------

    pub fn local_state(&self) -> LocalStateView {
        self.lock().local.view()
    }

    pub fn session(&self) -> Option<CallSession> {
        self.lock().session.clone()
    }

    pub fn is_joined(&self) -> bool {
        is_joined(&self.lock())
    }

    /// Whether a local track of `kind` is currently held.
    pub fn has_local_track(&self, kind: MediaKind) -> bool {
        let state = self.lock();
        match kind {
            MediaKind::Audio => state.local.audio_track.is_some(),
            MediaKind::Video => state.local.video_track.is_some(),
            MediaKind::Screen => state.local.screen_track.is_some(),
        }
    }

    pub async fn participants(&self) -> ParticipantSnapshot {
        self.registry.snapshot().await
    }

    pub async fn screen_sharer(&self) -> Option<RemoteParticipant> {
        self.registry.screen_sharer().await
    }

    pub fn events(&self) -> &EventBus<CallEvent> {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    pub fn media(&self) -> &LocalMediaManager {
        &self.media
    }

    pub fn registry(&self) -> &Arc<RemoteParticipantRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &HuddleConfig {
        &self.config
    }

    pub(super) fn engine(&self) -> &Arc<dyn MediaEngine> {
        &self.engine
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn joined_session(&self) -> Option<CallSession> {
        self.lock()
            .session
            .clone()
            .filter(|s| s.state == SessionState::Joined)
    }

    fn publish_local_state(&self) {
        let view = self.local_state();
        self.events.publish(CallEvent::LocalStateChanged(view));
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
    }
}

fn is_joined(state: &ClientState) -> bool {
    state
        .session
        .as_ref()
        .is_some_and(|s| s.state == SessionState::Joined)
}

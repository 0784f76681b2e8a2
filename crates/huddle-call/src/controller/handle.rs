//! Call controller: join/leave orchestration, teardown guard, duration ticker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use huddle_common::{CallError, ParticipantId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::collab::{CallLifecycle, MembershipDirectory};
use crate::events::{CallEndReason, CallEvent};
use crate::media::{ConnectionState, MediaKind};
use crate::session::SessionClient;

use super::types::{CallView, JoinIntent, SidePanel};
use super::view::{self, ViewInputs};

/// Channel and identity of the call in progress, for lifecycle notifications.
#[derive(Debug, Clone)]
struct ActiveCall {
    channel: String,
    identity: Option<ParticipantId>,
}

struct Inner {
    client: Arc<SessionClient>,
    /// True whenever there is no call to tear down. Starts true.
    left: AtomicBool,
    call: Mutex<Option<ActiveCall>>,
    panel: Mutex<Option<SidePanel>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.abort();
        }
        if self.left.swap(true, Ordering::SeqCst) {
            return;
        }
        // Unmounted mid-call: the session still holds devices.
        self.client
            .events()
            .publish(CallEvent::CallEnded(CallEndReason::Unmounted));
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let client = Arc::clone(&self.client);
                runtime.spawn(async move {
                    client.leave_channel().await;
                });
            }
            Err(_) => warn!("Call controller dropped outside a runtime; session not left"),
        }
    }
}

// ---------------------------------------------------------------------------
// Call Controller
// ---------------------------------------------------------------------------

/// UI-facing handle over one [`SessionClient`].
///
/// Cheap to clone; all clones drive the same call. Dropping the last
/// clone mid-call ends it with [`CallEndReason::Unmounted`].
#[derive(Clone)]
pub struct CallController {
    inner: Arc<Inner>,
    lifecycle: Option<Arc<dyn CallLifecycle>>,
    directory: Option<Arc<dyn MembershipDirectory>>,
}

/// What the ticker task keeps: no strong reference to the controller state.
struct WeakController {
    inner: Weak<Inner>,
    lifecycle: Option<Arc<dyn CallLifecycle>>,
    directory: Option<Arc<dyn MembershipDirectory>>,
}

impl WeakController {
    fn upgrade(&self) -> Option<CallController> {
        Some(CallController {
            inner: self.inner.upgrade()?,
            lifecycle: self.lifecycle.clone(),
            directory: self.directory.clone(),
        })
    }
}

impl CallController {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                left: AtomicBool::new(true),
                call: Mutex::new(None),
                panel: Mutex::new(None),
                ticker: Mutex::new(None),
            }),
            lifecycle: None,
            directory: None,
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn CallLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn MembershipDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn client(&self) -> &Arc<SessionClient> {
        &self.inner.client
    }

    // -- join / leave -------------------------------------------------------

    /// Record the call with the lifecycle service, join, and start the
    /// duration ticker.
    pub async fn join(
        &self,
        channel: &str,
        identity: Option<ParticipantId>,
        intent: JoinIntent,
    ) -> Result<ParticipantId, CallError> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(CallError::InvalidArgument("channel name is empty".into()));
        }
        self.inner.left.store(false, Ordering::SeqCst);
        {
            let mut call = lock(&self.inner.call);
            if call.is_none() {
                *call = Some(ActiveCall {
                    channel: channel.to_string(),
                    identity: identity.clone(),
                });
            }
        }

        if let Some(lifecycle) = &self.lifecycle {
            let recorded = match intent {
                JoinIntent::Start => lifecycle.start_call(channel, identity.as_ref()).await,
                JoinIntent::Join => lifecycle.join_call(channel, identity.as_ref()).await,
            };
            if let Err(e) = recorded {
                warn!(channel, ?intent, error = %e, "Lifecycle notification failed");
            }
        }

        match self.inner.client.join_channel(channel, identity).await {
            Ok(assigned) => {
                if let Some(call) = lock(&self.inner.call).as_mut() {
                    call.identity = Some(assigned.clone());
                }
                if !self.inner.left.load(Ordering::SeqCst) {
                    self.start_ticker();
                }
                Ok(assigned)
            }
            Err(CallError::Superseded) => Err(CallError::Superseded),
            Err(e) => {
                // A rejected second join leaves the first one's session alone.
                let no_session = self.inner.client.session().is_none();
                if no_session && !self.inner.left.swap(true, Ordering::SeqCst) {
                    let call = lock(&self.inner.call).take();
                    if let (Some(lifecycle), Some(call)) = (&self.lifecycle, &call) {
                        if let Err(e) = lifecycle
                            .leave_call(&call.channel, call.identity.as_ref())
                            .await
                        {
                            warn!(channel = %call.channel, error = %e, "Lifecycle leave notification failed");
                        }
                    }
                    self.inner
                        .client
                        .events()
                        .publish(CallEvent::CallEnded(CallEndReason::JoinFailed(e.to_string())));
                }
                Err(e)
            }
        }
    }

    /// End the call. Only the first call after a join does anything;
    /// later calls return `false`.
    pub async fn leave(&self, reason: CallEndReason) -> bool {
        self.inner.client.cancel_pending_join();
        if self.inner.left.swap(true, Ordering::SeqCst) {
            debug!(%reason, "Already left");
            return false;
        }
        if let Some(ticker) = lock(&self.inner.ticker).take() {
            ticker.abort();
        }

        self.inner.client.leave_channel().await;

        let call = lock(&self.inner.call).take();
        if let (Some(lifecycle), Some(call)) = (&self.lifecycle, &call) {
            if let Err(e) = lifecycle
                .leave_call(&call.channel, call.identity.as_ref())
                .await
            {
                warn!(channel = %call.channel, error = %e, "Lifecycle leave notification failed");
            }
        }

        info!(%reason, "Call ended");
        self.inner
            .client
            .events()
            .publish(CallEvent::CallEnded(reason));
        true
    }

    /// Host hang-up: leave and end the call for everyone.
    pub async fn end_call_for_all(&self) -> bool {
        let call = lock(&self.inner.call).clone();
        if !self.leave(CallEndReason::EndedForAll).await {
            return false;
        }
        if let (Some(lifecycle), Some(call)) = (&self.lifecycle, &call) {
            if let Err(e) = lifecycle
                .end_call(&call.channel, call.identity.as_ref())
                .await
            {
                warn!(channel = %call.channel, error = %e, "Lifecycle end notification failed");
            }
        }
        true
    }

    /// The engine dropped the connection while in a call.
    pub async fn handle_connection_lost(&self, reason: String) -> bool {
        warn!(%reason, "Connection lost");
        self.leave(CallEndReason::ConnectionLost(reason)).await
    }

    // -- media --------------------------------------------------------------

    pub fn toggle_audio(&self) -> bool {
        self.inner.client.toggle_audio()
    }

    pub fn toggle_video(&self) -> bool {
        self.inner.client.toggle_video()
    }

    pub async fn start_screen_share(&self) -> Result<(), CallError> {
        self.inner.client.start_screen_share().await
    }

    pub async fn stop_screen_share(&self) -> Result<(), CallError> {
        self.inner.client.stop_screen_share().await
    }

    /// Start sharing if not sharing, else stop.
    pub async fn toggle_screen_share(&self) -> Result<(), CallError> {
        if self.inner.client.local_state().is_screen_sharing {
            self.stop_screen_share().await
        } else {
            self.start_screen_share().await
        }
    }

    // -- view ---------------------------------------------------------------

    pub async fn view(&self) -> CallView {
        let client = &self.inner.client;
        let session = client.session();
        let participants = client.participants().await;
        let sharer = client.screen_sharer().await;
        let elapsed = session
            .as_ref()
            .map(|s| s.elapsed(Utc::now()))
            .unwrap_or_default();

        view::build(ViewInputs {
            session: session.as_ref(),
            local: client.local_state(),
            audio_available: client.has_local_track(MediaKind::Audio),
            video_available: client.has_local_track(MediaKind::Video),
            participants: &participants,
            sharer: sharer.as_ref(),
            panel: self.panel(),
            elapsed,
            directory: self.directory.as_deref(),
        })
    }

    pub fn panel(&self) -> Option<SidePanel> {
        *lock(&self.inner.panel)
    }

    pub fn set_panel(&self, panel: Option<SidePanel>) {
        *lock(&self.inner.panel) = panel;
    }

    /// Open `panel`, or close it if it is already open.
    pub fn toggle_panel(&self, panel: SidePanel) -> Option<SidePanel> {
        let mut current = lock(&self.inner.panel);
        *current = if *current == Some(panel) {
            None
        } else {
            Some(panel)
        };
        *current
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.client.subscribe()
    }

    // -- ticker -------------------------------------------------------------

    fn start_ticker(&self) {
        let weak = WeakController {
            inner: Arc::downgrade(&self.inner),
            lifecycle: self.lifecycle.clone(),
            directory: self.directory.clone(),
        };
        let events = self.inner.client.subscribe();
        let interval = self.inner.client.config().call.tick_interval();
        let handle = tokio::spawn(run_ticker(weak, events, interval));
        if let Some(previous) = lock(&self.inner.ticker).replace(handle) {
            previous.abort();
        }
    }
}

/// Publish duration ticks and watch for a dropped connection until the
/// call ends.
async fn run_ticker(
    weak: WeakController,
    mut events: broadcast::Receiver<CallEvent>,
    interval: Duration,
) {
    let mut ticks = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks.tick().await;

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let Some(controller) = weak.upgrade() else { break };
                if controller.inner.left.load(Ordering::SeqCst) {
                    break;
                }
                let elapsed = controller
                    .inner
                    .client
                    .session()
                    .map(|s| s.elapsed(Utc::now()))
                    .unwrap_or_default();
                controller
                    .inner
                    .client
                    .events()
                    .publish(CallEvent::DurationTick(elapsed));
            }
            event = events.recv() => match event {
                Ok(CallEvent::Connection {
                    state: ConnectionState::Disconnected,
                    reason: Some(reason),
                }) => {
                    let Some(controller) = weak.upgrade() else { break };
                    // Leave runs on its own task; it aborts this one.
                    tokio::spawn(async move {
                        controller.handle_connection_lost(reason).await;
                    });
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => debug!(missed, "Ticker lagged behind call events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("Call ticker stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

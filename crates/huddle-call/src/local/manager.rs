//! Local media manager: acquire and release camera, microphone, and screen tracks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use huddle_common::MediaError;
use huddle_config::schema::{ScreenQuality, VideoQuality};
use tracing::{debug, info, warn};

use crate::media::{LocalTrackRef, MediaEngine};

/// Microphone and camera opened together.
#[derive(Debug, Clone)]
pub struct AudioVideo {
    pub audio: LocalTrackRef,
    pub video: LocalTrackRef,
}

// ---------------------------------------------------------------------------
// Local Media Manager
// ---------------------------------------------------------------------------

/// Sole owner of local capture devices.
///
/// Every track it hands out stays registered until [`release`](Self::release)
/// closes it, so `held_tracks() == 0` means no device is left open.
pub struct LocalMediaManager {
    engine: Arc<dyn MediaEngine>,
    acquisition_timeout: Duration,
    /// Open tracks keyed by track id.
    held: Mutex<HashMap<String, LocalTrackRef>>,
}

impl LocalMediaManager {
    pub fn new(engine: Arc<dyn MediaEngine>, acquisition_timeout: Duration) -> Self {
        Self {
            engine,
            acquisition_timeout,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Open camera and microphone with the given quality profile.
    pub async fn acquire_audio_video(&self, quality: VideoQuality) -> Result<AudioVideo, MediaError> {
        let (audio, video) = self
            .bounded(
                "microphone+camera",
                self.engine.create_microphone_and_camera_tracks(quality),
            )
            .await?;
        self.hold(&audio);
        self.hold(&video);
        info!(
            audio = audio.id(),
            video = video.id(),
            width = quality.width(),
            height = quality.height(),
            "Acquired microphone and camera"
        );
        Ok(AudioVideo { audio, video })
    }

    pub async fn acquire_microphone(&self) -> Result<LocalTrackRef, MediaError> {
        let audio = self
            .bounded("microphone", self.engine.create_microphone_track())
            .await?;
        self.hold(&audio);
        info!(audio = audio.id(), "Acquired microphone");
        Ok(audio)
    }

    pub async fn acquire_camera(&self, quality: VideoQuality) -> Result<LocalTrackRef, MediaError> {
        let video = self
            .bounded("camera", self.engine.create_camera_track(quality))
            .await?;
        self.hold(&video);
        info!(video = video.id(), "Acquired camera");
        Ok(video)
    }

    /// Open the OS screen picker. A dismissed picker yields `UserCancelled`.
    pub async fn acquire_screen(&self, quality: ScreenQuality) -> Result<LocalTrackRef, MediaError> {
        let screen = self
            .bounded("screen", self.engine.create_screen_track(quality))
            .await?;
        self.hold(&screen);
        info!(screen = screen.id(), fps = quality.max_fps(), "Acquired screen capture");
        Ok(screen)
    }

    /// Stop and dispose a track. Safe to call more than once.
    ///
    /// Returns whether this call actually closed the device.
    pub fn release(&self, track: &LocalTrackRef) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(track.id());

        if track.is_closed() {
            debug!(track = track.id(), "Track already released");
            return false;
        }
        track.close();
        info!(track = track.id(), kind = %track.kind(), "Released track");
        true
    }

    /// Number of tracks acquired and not yet released.
    pub fn held_tracks(&self) -> usize {
        self.held.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn hold(&self, track: &LocalTrackRef) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(track.id().to_string(), Arc::clone(track));
    }

    async fn bounded<T>(
        &self,
        what: &'static str,
        acquisition: impl Future<Output = Result<T, MediaError>>,
    ) -> Result<T, MediaError> {
        match tokio::time::timeout(self.acquisition_timeout, acquisition).await {
            Ok(Ok(track)) => Ok(track),
            Ok(Err(e)) => {
                if e.is_user_cancelled() {
                    info!(device = what, "Acquisition cancelled by user");
                } else {
                    warn!(device = what, error = %e, "Acquisition failed");
                }
                Err(e)
            }
            Err(_) => {
                warn!(
                    device = what,
                    timeout_ms = self.acquisition_timeout.as_millis() as u64,
                    "Acquisition timed out"
                );
                Err(MediaError::AcquisitionTimeout(self.acquisition_timeout))
            }
        }
    }
}

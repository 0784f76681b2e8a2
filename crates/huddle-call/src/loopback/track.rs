//! In-process local track.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::media::{LocalTrack, MediaKind};

/// A track with no device behind it; only its flags change.
#[derive(Debug)]
pub struct LoopbackTrack {
    id: String,
    kind: MediaKind,
    enabled: AtomicBool,
    closed: AtomicBool,
}

impl LoopbackTrack {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }
}

impl LocalTrack for LoopbackTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

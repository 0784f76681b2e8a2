//! The media engine seam.
//!
//! The transport/codec engine is opaque: everything the orchestrator
//! needs from it is expressed by the [`MediaEngine`] trait and the track
//! handles it hands out.

mod engine;
mod types;

pub use engine::{EngineError, EngineEvent, EngineEvents, MediaEngine};
pub use types::{ConnectionState, LocalTrack, LocalTrackRef, MediaKind, RemoteTrack};

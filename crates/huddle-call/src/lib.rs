//! Video-call session orchestration.
//!
//! Joins and leaves a multi-party media session, owns local capture
//! devices, tracks what remote participants publish, and keeps at most
//! one local video-slot track published. The media engine itself is an
//! opaque [`MediaEngine`] implementation.

pub mod collab;
pub mod controller;
pub mod events;
pub mod local;
pub mod loopback;
pub mod media;
pub mod registry;
pub mod session;

pub use collab::{CallLifecycle, HttpCallLifecycle, LifecycleError, MembershipDirectory, StaticDirectory};
pub use controller::{CallController, CallLayout, CallPhase, CallView, JoinIntent, SidePanel};
pub use events::{CallEndReason, CallEvent};
pub use local::{LocalMediaManager, LocalStateView};
pub use loopback::LoopbackEngine;
pub use media::{ConnectionState, EngineError, EngineEvent, MediaEngine, MediaKind};
pub use registry::{ParticipantSnapshot, RemoteParticipant, RemoteParticipantRegistry};
pub use session::{CallSession, SessionClient, SessionState};

//! An in-process media engine.
//!
//! Backs the `huddle` binary's scripted calls and the test suites. Remote
//! participants are simulated by injecting engine events.

mod engine;
mod track;

pub use engine::LoopbackEngine;
pub use track::LoopbackTrack;

//! Local hardware: camera, microphone, and screen capture tracks.
//!
//! [`LocalMediaManager`] is the only place that opens or closes devices;
//! [`LocalMediaState`] records which of those tracks the session holds.

mod manager;
mod state;

pub use manager::{AudioVideo, LocalMediaManager};
pub use state::{LocalMediaState, LocalStateView};

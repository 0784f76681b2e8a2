//! Remote participants and the media they publish.
//!
//! Entries are created, updated, and removed only by engine callbacks.
//! Readers get immutable, insertion-ordered snapshots.

mod participants;
mod types;

#[cfg(test)]
mod tests;

pub use participants::RemoteParticipantRegistry;
pub use types::{ParticipantSnapshot, RemoteParticipant};

//! Join/leave/publish lifecycle against the media engine.
//!
//! [`SessionClient`] owns the single call session, the local tracks it
//! publishes, and the task that turns engine callbacks into registry
//! updates.

mod client;
mod pump;
mod types;

#[cfg(test)]
mod tests;

pub use client::SessionClient;
pub use types::{CallSession, SessionState};

//! UI-facing call orchestration.
//!
//! [`CallController`] wraps a [`SessionClient`](crate::session::SessionClient)
//! with the lifecycle collaborators, the "already left" teardown guard,
//! the call-duration ticker, and a derived [`CallView`] for rendering.

mod handle;
mod types;
mod view;


pub use handle::CallController;
pub use types::{CallLayout, CallPhase, CallView, DeviceToggle, JoinIntent, ParticipantTile, SidePanel};

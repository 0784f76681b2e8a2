//! Collaborators outside the media path: call bookkeeping and member names.

mod lifecycle;
mod membership;

pub use lifecycle::{CallAction, CallLifecycle, HttpCallLifecycle, LifecycleError};
pub use membership::{MembershipDirectory, StaticDirectory};

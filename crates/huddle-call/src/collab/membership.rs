//! Identity to display-name lookup for participant tiles.

use std::collections::HashMap;

use huddle_common::ParticipantId;

/// Resolves engine identities to the names shown on tiles.
pub trait MembershipDirectory: Send + Sync {
    fn display_name(&self, identity: &ParticipantId) -> Option<String>;
}

/// A fixed directory, typically loaded from the group's member list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<ParticipantId, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identity: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        self.insert(identity, name);
        self
    }

    pub fn insert(&mut self, identity: impl Into<ParticipantId>, name: impl Into<String>) {
        self.names.insert(identity.into(), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl MembershipDirectory for StaticDirectory {
    fn display_name(&self, identity: &ParticipantId) -> Option<String> {
        self.names.get(identity).cloned()
    }
}

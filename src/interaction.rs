//! Interaction controller: draw, modify, and delete are mutually exclusive.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    Draw,
    Modify,
    Delete,
}

impl InteractionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds at most one active interaction. Only the active one receives
/// pointer events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interactions {
    active: Option<InteractionMode>,
}

impl Interactions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> Option<InteractionMode> {
        self.active
    }

    /// Activate `mode`, deactivating the others. Calling it again with the
    /// same mode changes nothing. Returns `true` when the mode changed.
    pub fn set_active(&mut self, mode: InteractionMode) -> bool {
        if self.active == Some(mode) {
            return false;
        }
        debug!(from = ?self.active, to = %mode, "interaction switched");
        self.active = Some(mode);
        true
    }

    pub fn deactivate_all(&mut self) {
        self.active = None;
    }

    #[must_use]
    pub fn is_active(&self, mode: InteractionMode) -> bool {
        self.active == Some(mode)
    }

    /// Gate for pointer events produced by `mode`'s interaction.
    #[must_use]
    pub fn accepts(&self, mode: InteractionMode) -> bool {
        self.is_active(mode)
    }
}

#[cfg(test)]
#[path = "interaction_test.rs"]
mod tests;

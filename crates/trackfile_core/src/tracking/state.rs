//! Tracking state of an entry.

use std::fmt;

/// Lifecycle state of a tracked instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    /// Not tracked, or removed after a successful delete.
    Detached,
    /// Matches the last persisted snapshot.
    Unchanged,
    /// New; will be inserted on the next save.
    Added,
    /// Differs from the snapshot, or was explicitly marked modified.
    Modified,
    /// Will be removed on the next save.
    Deleted,
}

impl TrackingState {
    /// Returns true if a save has something to persist for this state.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detached => "detached",
            Self::Unchanged => "unchanged",
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_states() {
        assert!(TrackingState::Added.is_pending());
        assert!(TrackingState::Modified.is_pending());
        assert!(TrackingState::Deleted.is_pending());
        assert!(!TrackingState::Unchanged.is_pending());
        assert!(!TrackingState::Detached.is_pending());
    }
}

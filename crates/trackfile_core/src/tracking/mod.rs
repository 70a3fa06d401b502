//! Change tracking.
//!
//! Live objects are shared with the tracker through [`Tracked`] handles. The
//! tracker keeps one [`TrackerEntry`] per instance, holding its state and, for
//! entries that were persisted, an independent snapshot used by the lazy
//! dirty check.

mod entry;
mod state;
mod trackable;
mod tracker;

pub use entry::{downcast_entry, Entry, TrackerEntry};
pub use state::TrackingState;
pub use trackable::{AnyTracked, Entity, InstanceKey, Trackable, Tracked};
pub use tracker::ChangeTracker;

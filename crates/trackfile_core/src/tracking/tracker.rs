//! The change tracker.

use super::entry::{Entry, TrackerEntry};
use super::state::TrackingState;
use super::trackable::{InstanceKey, Trackable, Tracked};
use crate::uow::DataSet;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Ordered collection of tracker entries, unique per tracked instance.
///
/// Entries are matched by instance identity, never by business key: two
/// separate copies of the same logical entity produce two entries.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: Mutex<Vec<Arc<dyn TrackerEntry>>>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `instance` in `state`, or transitions its existing entry.
    ///
    /// The data set is only recorded when a new entry is created.
    pub fn add_or_update_entry<T: Trackable>(
        &self,
        instance: &Tracked<T>,
        state: TrackingState,
        data_set: Arc<dyn DataSet>,
    ) {
        let key = instance.key();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.iter().find(|e| e.instance_key() == key) {
            trace!(?key, %state, "transitioning tracked entry");
            entry.transition(state);
            return;
        }

        trace!(?key, %state, "tracking new entry");
        entries.push(Arc::new(Entry::new(instance.clone(), state, data_set)));
    }

    /// Returns a copy of the entry list, in tracking order.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<dyn TrackerEntry>> {
        self.entries.lock().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the entry tracking `instance`, if any.
    #[must_use]
    pub fn entry_for<T: Trackable>(&self, instance: &Tracked<T>) -> Option<Arc<dyn TrackerEntry>> {
        self.find(instance.key())
    }

    /// Returns the current state of `instance`, or `None` if untracked.
    #[must_use]
    pub fn state_of<T: Trackable>(&self, instance: &Tracked<T>) -> Option<TrackingState> {
        self.entry_for(instance).map(|entry| entry.state())
    }

    /// Finalizes every entry after a successful save.
    ///
    /// `Deleted` entries are removed from the tracker.
    pub fn accept_changes(&self) {
        for entry in self.entries() {
            self.accept_entry(&entry);
        }
    }

    /// Finalizes only the entries of the given instances.
    ///
    /// Keys that are not tracked are ignored.
    pub fn accept_changes_for(&self, keys: impl IntoIterator<Item = InstanceKey>) {
        let entries = self.entries();
        for key in keys {
            if let Some(entry) = entries.iter().find(|e| e.instance_key() == key) {
                self.accept_entry(entry);
            }
        }
    }

    /// Stops tracking `instance`.
    ///
    /// The entry is moved to `Detached` and removed. Returns false if the
    /// instance was not tracked.
    pub fn detach<T: Trackable>(&self, instance: &Tracked<T>) -> bool {
        let key = instance.key();
        let mut entries = self.entries.lock();

        let Some(position) = entries.iter().position(|e| e.instance_key() == key) else {
            return false;
        };

        let entry = entries.remove(position);
        entry.transition(TrackingState::Detached);
        true
    }

    fn find(&self, key: InstanceKey) -> Option<Arc<dyn TrackerEntry>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.instance_key() == key)
            .cloned()
    }

    fn accept_entry(&self, entry: &Arc<dyn TrackerEntry>) {
        if entry.state() == TrackingState::Deleted {
            self.entries.lock().retain(|e| !Arc::ptr_eq(e, entry));
        }
        entry.accept_changes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uow::EntityOperation;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        qty: u32,
    }

    struct NullDataSet;

    impl DataSet for NullDataSet {
        fn operation_for(self: Arc<Self>, _entry: Arc<dyn TrackerEntry>) -> EntityOperation {
            Box::pin(async { Ok(None) })
        }
    }

    fn setup() -> (ChangeTracker, Arc<dyn DataSet>) {
        (ChangeTracker::new(), Arc::new(NullDataSet))
    }

    fn item(name: &str) -> Tracked<Item> {
        Tracked::new(Item {
            name: name.into(),
            qty: 1,
        })
    }

    #[test]
    fn same_instance_is_tracked_once() {
        let (tracker, ds) = setup();
        let a = item("a");

        tracker.add_or_update_entry(&a, TrackingState::Added, Arc::clone(&ds));
        tracker.add_or_update_entry(&a, TrackingState::Modified, Arc::clone(&ds));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.state_of(&a), Some(TrackingState::Modified));
    }

    #[test]
    fn equal_copies_are_tracked_separately() {
        let (tracker, ds) = setup();
        let a = item("same");
        let b = Tracked::new(a.get());

        tracker.add_or_update_entry(&a, TrackingState::Added, Arc::clone(&ds));
        tracker.add_or_update_entry(&b, TrackingState::Added, Arc::clone(&ds));

        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn lazy_dirty_check_on_unchanged() {
        let (tracker, ds) = setup();
        let a = item("a");
        tracker.add_or_update_entry(&a, TrackingState::Unchanged, Arc::clone(&ds));

        a.write().qty = 5;
        assert_eq!(tracker.state_of(&a), Some(TrackingState::Modified));

        a.write().qty = 1;
        assert_eq!(tracker.state_of(&a), Some(TrackingState::Unchanged));
    }

    #[test]
    fn accept_changes_finalizes_all() {
        let (tracker, ds) = setup();
        let added = item("added");
        let modified = item("modified");
        let deleted = item("deleted");

        tracker.add_or_update_entry(&added, TrackingState::Added, Arc::clone(&ds));
        tracker.add_or_update_entry(&modified, TrackingState::Unchanged, Arc::clone(&ds));
        tracker.add_or_update_entry(&deleted, TrackingState::Unchanged, Arc::clone(&ds));
        modified.write().qty = 9;
        tracker.add_or_update_entry(&deleted, TrackingState::Deleted, Arc::clone(&ds));

        tracker.accept_changes();

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.state_of(&added), Some(TrackingState::Unchanged));
        assert_eq!(tracker.state_of(&modified), Some(TrackingState::Unchanged));
        assert_eq!(tracker.state_of(&deleted), None);
    }

    #[test]
    fn accept_changes_for_subset() {
        let (tracker, ds) = setup();
        let a = item("a");
        let b = item("b");
        let stranger = item("stranger");

        tracker.add_or_update_entry(&a, TrackingState::Added, Arc::clone(&ds));
        tracker.add_or_update_entry(&b, TrackingState::Added, Arc::clone(&ds));

        tracker.accept_changes_for([a.key(), stranger.key()]);

        assert_eq!(tracker.state_of(&a), Some(TrackingState::Unchanged));
        assert_eq!(tracker.state_of(&b), Some(TrackingState::Added));
        assert_eq!(tracker.state_of(&stranger), None);
    }

    #[test]
    fn detach_removes_entry() {
        let (tracker, ds) = setup();
        let a = item("a");
        tracker.add_or_update_entry(&a, TrackingState::Unchanged, Arc::clone(&ds));

        let entry = tracker.entry_for(&a).unwrap();
        assert!(tracker.detach(&a));
        assert!(!tracker.detach(&a));

        assert!(tracker.is_empty());
        assert_eq!(entry.state(), TrackingState::Detached);
        assert!(!entry.has_snapshot());
    }

    #[test]
    fn entries_keep_tracking_order() {
        let (tracker, ds) = setup();
        let items: Vec<_> = ["x", "y", "z"].iter().map(|n| item(n)).collect();
        for i in &items {
            tracker.add_or_update_entry(i, TrackingState::Added, Arc::clone(&ds));
        }

        let keys: Vec<_> = tracker.entries().iter().map(|e| e.instance_key()).collect();
        let expected: Vec<_> = items.iter().map(Tracked::key).collect();
        assert_eq!(keys, expected);
    }
}

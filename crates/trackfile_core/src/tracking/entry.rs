//! Tracker entries.

use super::state::TrackingState;
use super::trackable::{AnyTracked, InstanceKey, Trackable, Tracked};
use crate::uow::DataSet;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased view of a tracker entry.
///
/// The change tracker and the save orchestrator only see this trait; data
/// sets downcast to [`Entry<T>`] through [`TrackerEntry::as_any`].
pub trait TrackerEntry: Send + Sync + fmt::Debug {
    /// Returns the current state.
    ///
    /// While `Unchanged` or `Modified` with a snapshot, this compares the live
    /// instance to the snapshot first and updates the state accordingly.
    fn state(&self) -> TrackingState;

    /// Returns the identity of the tracked instance.
    fn instance_key(&self) -> InstanceKey;

    /// Returns a type-erased handle to the tracked instance.
    fn instance(&self) -> AnyTracked;

    /// Returns the owning data set.
    fn data_set(&self) -> Arc<dyn DataSet>;

    /// Finalizes the entry after a successful save.
    ///
    /// `Added`/`Modified` become `Unchanged`, `Deleted` becomes `Detached`.
    fn accept_changes(&self);

    /// Moves the entry to `state`, maintaining the snapshot.
    fn transition(&self, state: TrackingState);

    /// Returns true if the entry currently holds a snapshot.
    fn has_snapshot(&self) -> bool;

    /// Returns the entry as `Any` for downcasting to [`Entry<T>`].
    fn as_any(&self) -> &dyn Any;
}

struct EntryState<T> {
    state: TrackingState,
    snapshot: Option<T>,
}

/// Tracker entry for an instance of `T`.
pub struct Entry<T: Trackable> {
    instance: Tracked<T>,
    inner: Mutex<EntryState<T>>,
    data_set: Arc<dyn DataSet>,
}

impl<T: Trackable> Entry<T> {
    /// Creates an entry. Entries created as `Unchanged` take a snapshot.
    ///
    /// The entry keeps its data set alive until the entry leaves the tracker.
    pub fn new(instance: Tracked<T>, state: TrackingState, data_set: Arc<dyn DataSet>) -> Self {
        let snapshot = (state == TrackingState::Unchanged).then(|| instance.get());
        Self {
            instance,
            inner: Mutex::new(EntryState { state, snapshot }),
            data_set,
        }
    }

    /// Returns the tracked instance.
    #[must_use]
    pub fn tracked(&self) -> &Tracked<T> {
        &self.instance
    }

    /// Returns an independent copy of the snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<T> {
        self.inner.lock().snapshot.clone()
    }

    fn detect_changes(&self, inner: &mut EntryState<T>) {
        match inner.state {
            TrackingState::Added | TrackingState::Deleted | TrackingState::Detached => {}
            TrackingState::Unchanged | TrackingState::Modified => {
                let Some(snapshot) = &inner.snapshot else {
                    return;
                };
                let clean = *self.instance.read() == *snapshot;
                inner.state = if clean {
                    TrackingState::Unchanged
                } else {
                    TrackingState::Modified
                };
            }
        }
    }

    fn transition_locked(&self, inner: &mut EntryState<T>, next: TrackingState) {
        let current = inner.state;

        if next == TrackingState::Detached
            || (current == TrackingState::Unchanged && next == TrackingState::Modified)
        {
            inner.snapshot = None;
        } else if matches!(current, TrackingState::Added | TrackingState::Modified)
            && next == TrackingState::Unchanged
        {
            inner.snapshot = Some(self.instance.get());
        }

        inner.state = next;
    }
}

impl<T: Trackable> TrackerEntry for Entry<T> {
    fn state(&self) -> TrackingState {
        let mut inner = self.inner.lock();
        self.detect_changes(&mut inner);
        inner.state
    }

    fn instance_key(&self) -> InstanceKey {
        self.instance.key()
    }

    fn instance(&self) -> AnyTracked {
        self.instance.erase()
    }

    fn data_set(&self) -> Arc<dyn DataSet> {
        Arc::clone(&self.data_set)
    }

    fn accept_changes(&self) {
        let mut inner = self.inner.lock();
        self.detect_changes(&mut inner);

        match inner.state {
            TrackingState::Detached | TrackingState::Unchanged => {}
            TrackingState::Added | TrackingState::Modified => {
                self.transition_locked(&mut inner, TrackingState::Unchanged);
            }
            TrackingState::Deleted => self.transition_locked(&mut inner, TrackingState::Detached),
        }
    }

    fn transition(&self, state: TrackingState) {
        let mut inner = self.inner.lock();
        self.transition_locked(&mut inner, state);
    }

    fn has_snapshot(&self) -> bool {
        self.inner.lock().snapshot.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Trackable> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Entry")
            .field("type", &std::any::type_name::<T>())
            .field("key", &self.instance.key())
            .field("state", &inner.state)
            .field("has_snapshot", &inner.snapshot.is_some())
            .finish()
    }
}

/// Downcasts a type-erased entry to its typed form.
#[must_use]
pub fn downcast_entry<T: Trackable>(entry: &dyn TrackerEntry) -> Option<&Entry<T>> {
    entry.as_any().downcast_ref::<Entry<T>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uow::{DataSet, EntityOperation};

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        text: String,
    }

    struct NullDataSet;

    impl DataSet for NullDataSet {
        fn operation_for(self: Arc<Self>, _entry: Arc<dyn TrackerEntry>) -> EntityOperation {
            Box::pin(async { Ok(None) })
        }
    }

    fn make_entry(state: TrackingState) -> (Entry<Note>, Tracked<Note>, Arc<dyn DataSet>) {
        let data_set: Arc<dyn DataSet> = Arc::new(NullDataSet);
        let note = Tracked::new(Note {
            text: "draft".into(),
        });
        let entry = Entry::new(note.clone(), state, Arc::clone(&data_set));
        (entry, note, data_set)
    }

    #[test]
    fn unchanged_entry_takes_snapshot() {
        let (entry, _, _ds) = make_entry(TrackingState::Unchanged);
        assert!(entry.has_snapshot());

        let (added, _, _ds) = make_entry(TrackingState::Added);
        assert!(!added.has_snapshot());
    }

    #[test]
    fn dirty_check_flips_and_reverts() {
        let (entry, note, _ds) = make_entry(TrackingState::Unchanged);

        note.write().text = "edited".into();
        assert_eq!(entry.state(), TrackingState::Modified);

        note.write().text = "draft".into();
        assert_eq!(entry.state(), TrackingState::Unchanged);
    }

    #[test]
    fn forced_modified_drops_snapshot() {
        let (entry, _, _ds) = make_entry(TrackingState::Unchanged);

        entry.transition(TrackingState::Modified);
        assert!(!entry.has_snapshot());
        assert_eq!(entry.state(), TrackingState::Modified);
    }

    #[test]
    fn accept_added_resnapshots() {
        let (entry, note, _ds) = make_entry(TrackingState::Added);

        entry.accept_changes();
        assert_eq!(entry.state(), TrackingState::Unchanged);
        assert_eq!(entry.snapshot(), Some(note.get()));

        note.write().text = "later".into();
        assert_eq!(entry.state(), TrackingState::Modified);
    }

    #[test]
    fn accept_deleted_detaches() {
        let (entry, _, _ds) = make_entry(TrackingState::Unchanged);

        entry.transition(TrackingState::Deleted);
        entry.accept_changes();

        assert_eq!(entry.state(), TrackingState::Detached);
        assert!(!entry.has_snapshot());
    }

    #[test]
    fn snapshot_is_independent() {
        let (entry, note, _ds) = make_entry(TrackingState::Unchanged);

        let mut snapshot = entry.snapshot().unwrap();
        snapshot.text = "changed copy".into();

        assert_eq!(entry.snapshot().unwrap().text, "draft");
        assert_eq!(note.read().text, "draft");
    }

    #[test]
    fn entry_keeps_data_set_alive() {
        let (entry, _, data_set) = make_entry(TrackingState::Added);
        let weak = Arc::downgrade(&data_set);

        drop(data_set);
        assert!(weak.upgrade().is_some());
        assert!(Arc::ptr_eq(&entry.data_set(), &weak.upgrade().unwrap()));
    }

    #[test]
    fn downcast_to_typed_entry() {
        let (entry, note, _ds) = make_entry(TrackingState::Added);
        let erased: &dyn TrackerEntry = &entry;

        let typed = downcast_entry::<Note>(erased).unwrap();
        assert!(typed.tracked().ptr_eq(&note));
        assert!(downcast_entry::<String>(erased).is_none());
    }
}

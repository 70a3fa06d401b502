//! The file storage context: the save orchestrator.

use crate::error::{CoreError, CoreResult, EntityOperationError};
use crate::tracking::{ChangeTracker, InstanceKey, TrackerEntry};
use crate::uow::{DataSet, UnitOfWork};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A unit of work over file data sets.
///
/// Data sets are created against the context's [`ChangeTracker`]; a call to
/// [`UnitOfWork::save_tracked_changes`] then persists every pending change.
///
/// # Save semantics
///
/// Pending entries are grouped by owning data set, in the order the data sets
/// first appear in the tracker. Transactional data sets receive the whole
/// group as one transaction; other data sets run one operation per entry.
///
/// - If some changes fail, the others are still accepted and the save returns
///   [`CoreError::EntityOperation`] with every failure.
/// - Infrastructure errors (lock timeout, I/O, codec) abort the save and leave
///   every entry pending.
/// - Cancellation is checked before each group.
#[derive(Debug, Default)]
pub struct FileStorageContext {
    tracker: Arc<ChangeTracker>,
}

impl FileStorageContext {
    /// Creates a context with an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the change tracker shared with this context's data sets.
    #[must_use]
    pub fn change_tracker(&self) -> &Arc<ChangeTracker> {
        &self.tracker
    }
}

#[async_trait]
impl UnitOfWork for FileStorageContext {
    async fn save_tracked_changes(&self, cancel: &CancellationToken) -> CoreResult<()> {
        save_tracker(&self.tracker, cancel).await
    }
}

type Group = (Arc<dyn DataSet>, Vec<Arc<dyn TrackerEntry>>);

/// Persists every pending entry of `tracker`.
///
/// This is the orchestration behind [`FileStorageContext`]; other unit of
/// work implementations owning a tracker can reuse it.
///
/// # Errors
///
/// See [`FileStorageContext`].
pub async fn save_tracker(tracker: &ChangeTracker, cancel: &CancellationToken) -> CoreResult<()> {
    let pending: Vec<_> = tracker
        .entries()
        .into_iter()
        .filter(|entry| entry.state().is_pending())
        .collect();

    if pending.is_empty() {
        debug!("no pending changes to save");
        return Ok(());
    }

    let groups = group_by_data_set(&pending);
    debug!(entries = pending.len(), groups = groups.len(), "saving tracked changes");

    let mut failures = Vec::new();
    for (data_set, entries) in groups {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        if let Some(transactional) = data_set.as_transactional() {
            transactional.begin_transaction().await?;
            for entry in &entries {
                transactional.add_entity_change_to_transaction(Arc::clone(entry));
            }
            failures.extend(transactional.commit_transaction().await?);
        } else {
            for entry in entries {
                if let Some(failure) = Arc::clone(&data_set).operation_for(entry).await? {
                    failures.push(failure);
                }
            }
        }
    }

    let keys = pending.iter().map(|entry| entry.instance_key());
    if failures.is_empty() {
        tracker.accept_changes_for(keys);
        debug!(entries = pending.len(), "saved tracked changes");
        return Ok(());
    }

    let failed: HashSet<InstanceKey> = failures.iter().map(|f| f.entity().key()).collect();
    tracker.accept_changes_for(keys.filter(|key| !failed.contains(key)));
    warn!(
        failed = failures.len(),
        entries = pending.len(),
        "some tracked changes could not be saved"
    );

    Err(EntityOperationError::new(failures)
        .with_message("failed to save tracked changes")
        .into())
}

fn group_by_data_set(entries: &[Arc<dyn TrackerEntry>]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();

    for entry in entries {
        let data_set = entry.data_set();
        match groups.iter_mut().find(|(ds, _)| same_data_set(ds, &data_set)) {
            Some((_, group)) => group.push(Arc::clone(entry)),
            None => groups.push((data_set, vec![Arc::clone(entry)])),
        }
    }

    groups
}

fn same_data_set(a: &Arc<dyn DataSet>, b: &Arc<dyn DataSet>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

//! File-backed data sets.
//!
//! - [`JsonFileDataSet`] stores one entity per file.
//! - [`SingleEntityFileDataSet`] stores exactly one entity in one file.
//! - [`TransactionalFileDataSet`] stores every entity of a type in one file
//!   and commits a save all-or-nothing under an exclusive OS lock.

mod json_file;
mod resolver;
mod simple;
mod single_entity;
mod transactional;

pub use json_file::JsonFileDataSet;
pub use resolver::{EntityPathResolver, FolderResolver};
pub use single_entity::SingleEntityFileDataSet;
pub use transactional::TransactionalFileDataSet;

use crate::tracking::{ChangeTracker, Trackable, Tracked, TrackingState};
use crate::uow::DataSet;
use std::sync::Weak;
use tracing::warn;

/// Registers `entity` with the tracker a data set was created against.
///
/// Data sets hold their tracker weakly; once the owning context is gone the
/// call is logged and ignored.
fn track<T, D>(tracker: &Weak<ChangeTracker>, data_set: &Weak<D>, entity: &Tracked<T>, state: TrackingState)
where
    T: Trackable,
    D: DataSet + 'static,
{
    let (Some(tracker), Some(data_set)) = (tracker.upgrade(), data_set.upgrade()) else {
        warn!(%state, "change tracker has been dropped, entity not tracked");
        return;
    };
    tracker.add_or_update_entry(entity, state, data_set);
}

//! Unit of work and repository contracts.

use crate::error::CoreResult;
use crate::tracking::{Trackable, Tracked};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Persists every pending change tracked by this unit of work.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Saves all tracked changes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::EntityOperation`] if some entity changes
    /// failed (the others are still accepted), or an infrastructure error
    /// if the save was aborted.
    async fn save_tracked_changes(&self, cancel: &CancellationToken) -> CoreResult<()>;
}

/// Records intended changes of `T` for a later save.
pub trait EntityRepository<T: Trackable>: Send + Sync {
    /// Marks `entity` as added.
    fn add_entity(&self, entity: &Tracked<T>);

    /// Marks `entity` as modified.
    fn update_entity(&self, entity: &Tracked<T>);

    /// Marks `entity` as deleted.
    fn remove_entity(&self, entity: &Tracked<T>);
}

/// A repository that is its own unit of work.
pub trait StandaloneRepository<T: Trackable>: EntityRepository<T> + UnitOfWork {}

impl<T: Trackable, R> StandaloneRepository<T> for R where R: EntityRepository<T> + UnitOfWork {}

//! Exactly one entity in one file.

use super::simple;
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::tracking::{downcast_entry, ChangeTracker, Trackable, TrackerEntry, Tracked, TrackingState};
use crate::uow::{noop_operation, DataSet, EntityOperation, EntityRepository};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use trackfile_codec::encode_value;

/// A data set whose whole content is a single entity, such as a settings
/// file.
pub struct SingleEntityFileDataSet<T> {
    this: Weak<Self>,
    tracker: Weak<ChangeTracker>,
    path: PathBuf,
    config: StoreConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T> SingleEntityFileDataSet<T>
where
    T: Trackable + Serialize + DeserializeOwned,
{
    /// Creates a data set stored at `path`.
    pub fn new(tracker: &Arc<ChangeTracker>, path: impl Into<PathBuf>, config: StoreConfig) -> Arc<Self> {
        let path = path.into();
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            tracker: Arc::downgrade(tracker),
            path,
            config,
            _entity: PhantomData,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks `entity` as added.
    pub fn add_entity(&self, entity: &Tracked<T>) {
        self.track(entity, TrackingState::Added);
    }

    /// Marks `entity` as modified.
    pub fn update_entity(&self, entity: &Tracked<T>) {
        self.track(entity, TrackingState::Modified);
    }

    /// Marks `entity` as deleted.
    pub fn delete_entity(&self, entity: &Tracked<T>) {
        self.track(entity, TrackingState::Deleted);
    }

    /// Reads the entity, or `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn get_entity(&self, track: bool) -> CoreResult<Option<Tracked<T>>> {
        let Some(value) = simple::read_entity::<T>(&self.path, &self.config).await? else {
            return Ok(None);
        };

        let entity = Tracked::new(value);
        if track {
            self.track(&entity, TrackingState::Unchanged);
        }
        Ok(Some(entity))
    }

    fn track(&self, entity: &Tracked<T>, state: TrackingState) {
        super::track(&self.tracker, &self.this, entity, state);
    }
}

impl<T> DataSet for SingleEntityFileDataSet<T>
where
    T: Trackable + Serialize + DeserializeOwned,
{
    fn operation_for(self: Arc<Self>, entry: Arc<dyn TrackerEntry>) -> EntityOperation {
        let state = entry.state();
        if !state.is_pending() {
            return noop_operation();
        }

        Box::pin(async move {
            let typed = downcast_entry::<T>(&*entry)
                .ok_or_else(|| CoreError::invalid_operation("entry does not belong to this data set"))?;
            let instance = entry.instance();

            match state {
                TrackingState::Added => {
                    let contents = encode_value(self.config.format, &*typed.tracked().read())?;
                    simple::add_file(instance, &self.path, contents).await
                }
                TrackingState::Modified => {
                    let contents = encode_value(self.config.format, &*typed.tracked().read())?;
                    simple::update_file(instance, &self.path, contents, &self.config).await
                }
                TrackingState::Deleted => simple::delete_file(instance, &self.path, &self.config).await,
                TrackingState::Unchanged | TrackingState::Detached => Ok(None),
            }
        })
    }
}

impl<T> EntityRepository<T> for SingleEntityFileDataSet<T>
where
    T: Trackable + Serialize + DeserializeOwned,
{
    fn add_entity(&self, entity: &Tracked<T>) {
        Self::add_entity(self, entity);
    }

    fn update_entity(&self, entity: &Tracked<T>) {
        Self::update_entity(self, entity);
    }

    fn remove_entity(&self, entity: &Tracked<T>) {
        self.delete_entity(entity);
    }
}

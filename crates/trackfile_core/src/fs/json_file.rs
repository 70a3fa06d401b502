//! One file per entity.

use super::resolver::{EntityPathResolver, FolderResolver};
use super::simple;
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::tracking::{downcast_entry, ChangeTracker, Entity, TrackerEntry, Tracked, TrackingState};
use crate::uow::{noop_operation, DataSet, EntityOperation, EntityRepository};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::warn;
use trackfile_codec::encode_value;

/// A data set storing each entity in its own file.
///
/// Files are addressed through an [`EntityPathResolver`]; the default
/// [`FolderResolver`] uses `{folder}/{id}.{ext}` where `ext` follows the
/// configured format.
pub struct JsonFileDataSet<T: Entity> {
    this: Weak<Self>,
    tracker: Weak<ChangeTracker>,
    resolver: Arc<dyn EntityPathResolver<T::Id>>,
    config: StoreConfig,
}

impl<T> JsonFileDataSet<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Creates a data set storing files in `folder`.
    pub fn in_folder(
        tracker: &Arc<ChangeTracker>,
        folder: impl Into<PathBuf>,
        config: StoreConfig,
    ) -> Arc<Self> {
        let resolver = FolderResolver::new(folder, config.format.extension());
        Self::with_resolver(tracker, Arc::new(resolver), config)
    }

    /// Creates a data set addressing files through `resolver`.
    pub fn with_resolver(
        tracker: &Arc<ChangeTracker>,
        resolver: Arc<dyn EntityPathResolver<T::Id>>,
        config: StoreConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            tracker: Arc::downgrade(tracker),
            resolver,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
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

    /// Reads the entity with `id`.
    ///
    /// With `track`, the entity is registered as `Unchanged` so that later
    /// in-place changes are saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn get_by_id(&self, id: &T::Id, track: bool) -> CoreResult<Option<Tracked<T>>> {
        let path = self.resolver.path_for_id(id).await?;
        self.get_by_location(&path, track).await
    }

    /// Reads the entity stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn get_by_location(&self, path: &Path, track: bool) -> CoreResult<Option<Tracked<T>>> {
        let Some(value) = simple::read_entity::<T>(path, &self.config).await? else {
            return Ok(None);
        };

        let entity = Tracked::new(value);
        if track {
            self.track(&entity, TrackingState::Unchanged);
        }
        Ok(Some(entity))
    }

    /// Reads every entity of the store, untracked.
    ///
    /// Paths reported by the resolver that hold no entity are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or decoded.
    pub async fn enumerate(&self) -> CoreResult<Vec<Tracked<T>>> {
        let mut entities = Vec::new();
        for path in self.resolver.all_paths().await? {
            match self.get_by_location(&path, false).await? {
                Some(entity) => entities.push(entity),
                None => warn!(path = %path.display(), "entity at expected path could not be fetched"),
            }
        }
        Ok(entities)
    }

    fn track(&self, entity: &Tracked<T>, state: TrackingState) {
        super::track(&self.tracker, &self.this, entity, state);
    }
}

impl<T> DataSet for JsonFileDataSet<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    fn operation_for(self: Arc<Self>, entry: Arc<dyn TrackerEntry>) -> EntityOperation {
        let state = entry.state();
        if !state.is_pending() {
            return noop_operation();
        }

        Box::pin(async move {
            let typed = downcast_entry::<T>(&*entry)
                .ok_or_else(|| CoreError::invalid_operation("entry does not belong to this data set"))?;
            let value = typed.tracked().get();
            let path = self.resolver.path_for_id(&value.id()).await?;
            let instance = entry.instance();

            match state {
                TrackingState::Added => {
                    let contents = encode_value(self.config.format, &value)?;
                    simple::add_file(instance, &path, contents).await
                }
                TrackingState::Modified => {
                    let contents = encode_value(self.config.format, &value)?;
                    simple::update_file(instance, &path, contents, &self.config).await
                }
                TrackingState::Deleted => simple::delete_file(instance, &path, &self.config).await,
                TrackingState::Unchanged | TrackingState::Detached => Ok(None),
            }
        })
    }
}

impl<T> EntityRepository<T> for JsonFileDataSet<T>
where
    T: Entity + Serialize + DeserializeOwned,
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

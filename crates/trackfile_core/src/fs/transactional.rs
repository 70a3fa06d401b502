//! All entities of one type in one file, committed all-or-nothing.
//!
//! The file holds an ordered sequence of `{key, value}` records. A save
//! rewrites the whole file:
//!
//! 1. `begin_transaction` waits for the process-local [`FileGate`] and for any
//!    transaction in flight on the same file, then opens the file with an
//!    exclusive OS lock, retrying until the configured lock timeout.
//! 2. `add_entity_change_to_transaction` queues entries without validation.
//! 3. `commit_transaction` decodes the records, applies every queued change
//!    and writes the file back only if none of them failed. Otherwise the file
//!    is left untouched and the changes that would have succeeded are reported
//!    as [`EntityOperationErrorCode::FailedBecauseOfTransaction`].
//!
//! Readers wait for the in-flight transaction and then take a shared OS lock.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::pagination::paginate;
use crate::tracking::{
    downcast_entry, AnyTracked, ChangeTracker, Entity, TrackerEntry, Tracked, TrackingState,
};
use crate::uow::{
    DataSet, EntityOperation, EntityOperationErrorCode, EntityOperationFailure, EntityRepository,
    TransactionalDataSet,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::debug;
use trackfile_codec::{decode_records, encode_records, Record};
use trackfile_storage::{
    open_exclusive_with_retry, open_shared_with_retry, FileGate, InFlight, LockedFile,
};

struct Transaction {
    file: LockedFile,
    in_flight: InFlight,
    pending: Vec<Arc<dyn TrackerEntry>>,
}

/// A change captured from a tracker entry at commit time.
struct PendingChange<T: Entity> {
    instance: AnyTracked,
    state: TrackingState,
    id: T::Id,
    value: T,
}

/// A transactional data set storing every entity of `T` in one file.
///
/// Several data sets may point at the same file (for example one lenient and
/// one strict view); they share the file's gate and never run transactions
/// concurrently within the process.
pub struct TransactionalFileDataSet<T: Entity> {
    this: Weak<Self>,
    tracker: Weak<ChangeTracker>,
    path: PathBuf,
    gate: Arc<FileGate>,
    config: StoreConfig,
    transaction: Mutex<Option<Transaction>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> TransactionalFileDataSet<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Creates a data set stored at `path`, sharing the process-wide gate of
    /// that file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the path cannot be normalized.
    pub fn open(
        tracker: &Arc<ChangeTracker>,
        path: impl Into<PathBuf>,
        config: StoreConfig,
    ) -> CoreResult<Arc<Self>> {
        let path = path.into();
        let gate = FileGate::for_path(&path)?;
        Ok(Self::with_gate(tracker, path, gate, config))
    }

    /// Creates a data set coordinated through an explicit gate.
    pub fn with_gate(
        tracker: &Arc<ChangeTracker>,
        path: impl Into<PathBuf>,
        gate: Arc<FileGate>,
        config: StoreConfig,
    ) -> Arc<Self> {
        let path = path.into();
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            tracker: Arc::downgrade(tracker),
            path,
            gate,
            config,
            transaction: Mutex::new(None),
            _entity: PhantomData,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns true while a transaction of this data set is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction.lock().is_some()
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
    /// With `track`, the entity is registered as `Unchanged`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockTimeout`] if another process keeps the file
    /// locked, or an error if the file cannot be read or decoded.
    pub async fn get_entity_by_id(&self, id: &T::Id, track: bool) -> CoreResult<Option<Tracked<T>>> {
        let records = self.read_records().await?;
        let Some(record) = records.into_iter().find(|record| record.key == *id) else {
            return Ok(None);
        };

        let entity = Tracked::new(record.value);
        if track {
            self.track(&entity, TrackingState::Unchanged);
        }
        Ok(Some(entity))
    }

    /// Reads one page of entities in file order.
    ///
    /// `page_size == 0` returns every entity; `page` is 1-based and values
    /// below 1 select the first page.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockTimeout`] if another process keeps the file
    /// locked, or an error if the file cannot be read or decoded.
    pub async fn get_entities(
        &self,
        page_size: usize,
        page: i64,
        track: bool,
    ) -> CoreResult<Vec<Tracked<T>>> {
        let records = self.read_records().await?;
        let entities: Vec<_> = paginate(records, page, page_size)
            .into_iter()
            .map(|record| Tracked::new(record.value))
            .collect();

        if track {
            for entity in &entities {
                self.track(entity, TrackingState::Unchanged);
            }
        }
        Ok(entities)
    }

    async fn read_records(&self) -> CoreResult<Vec<Record<T::Id, T>>> {
        let file = {
            let _gate = self.gate.enter().await;
            self.gate.wait_in_flight().await;
            open_shared_with_retry(&self.path, self.config.lock_policy()).await?
        };

        let Some(mut file) = file else {
            return Ok(Vec::new());
        };

        let format = self.config.format;
        tokio::task::spawn_blocking(move || -> CoreResult<Vec<Record<T::Id, T>>> {
            let bytes = file.read_all()?;
            file.close()?;
            Ok(decode_records(format, &bytes)?)
        })
        .await?
    }

    fn track(&self, entity: &Tracked<T>, state: TrackingState) {
        super::track(&self.tracker, &self.this, entity, state);
    }

    fn capture(entry: &Arc<dyn TrackerEntry>) -> CoreResult<Option<PendingChange<T>>> {
        let state = entry.state();
        if !state.is_pending() {
            return Ok(None);
        }

        let typed = downcast_entry::<T>(&**entry)
            .ok_or_else(|| CoreError::invalid_operation("entry does not belong to this data set"))?;
        let value = typed.tracked().get();

        Ok(Some(PendingChange {
            instance: entry.instance(),
            state,
            id: value.id(),
            value,
        }))
    }
}

impl<T> DataSet for TransactionalFileDataSet<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    fn operation_for(self: Arc<Self>, _entry: Arc<dyn TrackerEntry>) -> EntityOperation {
        Box::pin(async {
            Err(CoreError::invalid_operation(
                "transactional data sets do not support per-entry operations",
            ))
        })
    }

    fn as_transactional(&self) -> Option<&dyn TransactionalDataSet> {
        Some(self)
    }
}

#[async_trait]
impl<T> TransactionalDataSet for TransactionalFileDataSet<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    async fn begin_transaction(&self) -> CoreResult<()> {
        if self.in_transaction() {
            return Err(CoreError::invalid_operation(
                "a transaction is already in progress on this data set",
            ));
        }

        let _gate = self.gate.enter().await;
        let in_flight = self.gate.claim_in_flight().await;
        let file = open_exclusive_with_retry(&self.path, self.config.lock_policy()).await?;

        debug!(path = %self.path.display(), "began file transaction");
        *self.transaction.lock() = Some(Transaction {
            file,
            in_flight,
            pending: Vec::new(),
        });
        Ok(())
    }

    fn add_entity_change_to_transaction(&self, entry: Arc<dyn TrackerEntry>) {
        if let Some(transaction) = self.transaction.lock().as_mut() {
            transaction.pending.push(entry);
        }
    }

    async fn commit_transaction(&self) -> CoreResult<Vec<EntityOperationFailure>> {
        let transaction = self.transaction.lock().take();
        let Some(transaction) = transaction else {
            return Err(CoreError::invalid_operation(
                "no transaction is currently in progress",
            ));
        };

        let Transaction {
            file,
            in_flight,
            pending,
        } = transaction;

        let changes = pending
            .iter()
            .filter_map(|entry| Self::capture(entry).transpose())
            .collect::<CoreResult<Vec<_>>>()?;

        let config = self.config.clone();
        let count = changes.len();
        let result = tokio::task::spawn_blocking(move || apply_changes(file, changes, &config)).await;
        drop(in_flight);

        let failures = result??;
        debug!(
            path = %self.path.display(),
            changes = count,
            failed = failures.len(),
            "committed file transaction"
        );
        Ok(failures)
    }
}

impl<T> EntityRepository<T> for TransactionalFileDataSet<T>
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

/// Applies the changes to the file contents, all-or-nothing.
fn apply_changes<T>(
    mut file: LockedFile,
    changes: Vec<PendingChange<T>>,
    config: &StoreConfig,
) -> CoreResult<Vec<EntityOperationFailure>>
where
    T: Entity + Serialize + DeserializeOwned,
{
    if changes.is_empty() {
        file.close()?;
        return Ok(Vec::new());
    }

    let bytes = file.read_all()?;
    let mut table: IndexMap<T::Id, T> = decode_records::<T::Id, T>(config.format, &bytes)?
        .into_iter()
        .map(|record| (record.key, record.value))
        .collect();

    let mut failures = Vec::new();
    let mut applied = Vec::new();

    for change in changes {
        let PendingChange {
            instance,
            state,
            id,
            value,
        } = change;

        match state {
            TrackingState::Added => {
                if table.contains_key(&id) {
                    failures.push(
                        EntityOperationFailure::new(instance, EntityOperationErrorCode::EntityAlreadyExists)
                            .with_message(format!("entity with id '{id}' already exists")),
                    );
                    continue;
                }
                table.insert(id, value);
            }
            TrackingState::Modified => {
                if !config.allow_upsert && !table.contains_key(&id) {
                    failures.push(
                        EntityOperationFailure::new(instance, EntityOperationErrorCode::EntityDoesNotExist)
                            .with_message(format!("entity with id '{id}' does not exist")),
                    );
                    continue;
                }
                table.insert(id, value);
            }
            TrackingState::Deleted => {
                if table.shift_remove(&id).is_none() && !config.ignore_missing_on_delete {
                    failures.push(
                        EntityOperationFailure::new(instance, EntityOperationErrorCode::EntityDoesNotExist)
                            .with_message(format!("entity with id '{id}' does not exist")),
                    );
                    continue;
                }
            }
            TrackingState::Unchanged | TrackingState::Detached => continue,
        }

        applied.push(instance);
    }

    if !failures.is_empty() {
        failures.extend(applied.into_iter().map(|instance| {
            EntityOperationFailure::new(instance, EntityOperationErrorCode::FailedBecauseOfTransaction)
        }));
        file.close()?;
        return Ok(failures);
    }

    let records: Vec<Record<&T::Id, &T>> = table
        .iter()
        .map(|(key, value)| Record::new(key, value))
        .collect();
    let contents = encode_records(config.format, &records)?;

    file.overwrite(&contents)?;
    file.flush()?;
    file.close()?;
    Ok(Vec::new())
}

//! Cross-crate integration test helpers.
//!
//! Raw record access for transactional store files, and recording fakes for
//! exercising sagas without touching the file system.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trackfile_codec::{decode_records, encode_records, Format, Record};
use trackfile_core::{CoreError, CoreResult, Entity, EntityRepository, Trackable, Tracked, UnitOfWork};

/// An ordered log of events shared between fakes.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Writes `entities` to `path` as records keyed by their identifiers.
pub fn seed_records<T>(path: &Path, format: Format, entities: &[T])
where
    T: Entity + Serialize,
{
    let records: Vec<_> = entities.iter().map(|e| Record::new(e.id(), e)).collect();
    let bytes = encode_records(format, &records).expect("Failed to encode records");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(path, bytes).expect("Failed to write records");
}

/// Reads the records stored at `path`; a missing file has no records.
pub fn read_records<K, V>(path: &Path, format: Format) -> Vec<Record<K, V>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    match std::fs::read(path) {
        Ok(bytes) => decode_records(format, &bytes).expect("Failed to decode records"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => panic!("Failed to read {}: {err}", path.display()),
    }
}

/// A unit of work that records each save and can be told to fail.
pub struct RecordingUnitOfWork {
    name: String,
    log: EventLog,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingUnitOfWork {
    /// Creates a unit of work logging `save {name}` to `log`.
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            saves: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        })
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the number of save attempts.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitOfWork for RecordingUnitOfWork {
    async fn save_tracked_changes(&self, cancel: &CancellationToken) -> CoreResult<()> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        self.saves.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("save {}", self.name));

        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::invalid_operation(format!("{} refused to save", self.name)));
        }
        Ok(())
    }
}

/// A repository call recorded by [`RecordingRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryCall {
    /// `add_entity`
    Add,
    /// `update_entity`
    Update,
    /// `remove_entity`
    Remove,
}

/// A repository that records every call together with a copy of the entity.
pub struct RecordingRepository<T> {
    name: String,
    log: EventLog,
    calls: Mutex<Vec<(RepositoryCall, T)>>,
}

impl<T: Trackable> RecordingRepository<T> {
    /// Creates a repository logging `{call} {name}` to `log`.
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<(RepositoryCall, T)> {
        self.calls.lock().clone()
    }

    fn record(&self, call: RepositoryCall, entity: &Tracked<T>) {
        let verb = match call {
            RepositoryCall::Add => "add",
            RepositoryCall::Update => "update",
            RepositoryCall::Remove => "remove",
        };
        self.log.lock().push(format!("{verb} {}", self.name));
        self.calls.lock().push((call, entity.get()));
    }
}

impl<T: Trackable> EntityRepository<T> for RecordingRepository<T> {
    fn add_entity(&self, entity: &Tracked<T>) {
        self.record(RepositoryCall::Add, entity);
    }

    fn update_entity(&self, entity: &Tracked<T>) {
        self.record(RepositoryCall::Update, entity);
    }

    fn remove_entity(&self, entity: &Tracked<T>) {
        self.record(RepositoryCall::Remove, entity);
    }
}

/// Returns a snapshot of `log`.
pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().clone()
}

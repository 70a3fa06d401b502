//! Process-local coordination for a single physical file.
//!
//! Every store that targets the same file shares one [`FileGate`]. The gate
//! holds two async mutexes:
//!
//! - the *creation gate*, held while a handle is being opened, so that no two
//!   handles for the file are created concurrently within this process;
//! - the *in-flight signal*, held by a write transaction from `begin` until its
//!   handle is closed. Readers and later writers wait on it.
//!
//! The OS lock on the file is what excludes other processes; the gate only
//! orders tasks inside this one.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, OwnedMutexGuard};
use tracing::trace;

type Registry = Mutex<HashMap<PathBuf, Weak<FileGate>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Process-local gate and in-flight signal of one physical file.
#[derive(Debug)]
pub struct FileGate {
    path: PathBuf,
    creation: AsyncMutex<()>,
    in_flight: Arc<AsyncMutex<()>>,
}

impl FileGate {
    /// Creates a gate that is not shared through the process registry.
    ///
    /// Useful when the caller wants to inject its own coordination, for
    /// example in tests.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            creation: AsyncMutex::new(()),
            in_flight: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Returns the gate registered for `path`, creating it on first use.
    ///
    /// The path is normalized first, so two spellings of the same file share
    /// one gate. The registry only keeps weak references; a gate lives as long
    /// as some store holds it.
    pub fn for_path(path: &Path) -> io::Result<Arc<Self>> {
        let key = normalize_path(path)?;
        let mut gates = registry().lock();

        if let Some(gate) = gates.get(&key).and_then(Weak::upgrade) {
            return Ok(gate);
        }

        gates.retain(|_, gate| gate.strong_count() > 0);
        let gate = Arc::new(Self::new(key.clone()));
        gates.insert(key, Arc::downgrade(&gate));
        trace!(path = %gate.path.display(), "registered file gate");
        Ok(gate)
    }

    /// Returns the normalized path this gate guards.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Enters the creation gate.
    ///
    /// Handle creation for this file is serialized while the guard lives.
    pub async fn enter(&self) -> GateGuard<'_> {
        GateGuard {
            _guard: self.creation.lock().await,
        }
    }

    /// Waits until no write transaction is in flight on this file.
    pub async fn wait_in_flight(&self) {
        let _ = self.in_flight.lock().await;
    }

    /// Claims the in-flight signal, waiting for any current holder first.
    ///
    /// The signal is released when the returned [`InFlight`] is dropped.
    pub async fn claim_in_flight(&self) -> InFlight {
        InFlight {
            _guard: Arc::clone(&self.in_flight).lock_owned().await,
        }
    }

    /// Returns true if a write transaction currently holds the signal.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }
}

/// Guard for the creation gate of a [`FileGate`].
#[derive(Debug)]
pub struct GateGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Marks a write transaction as in flight until dropped.
#[derive(Debug)]
pub struct InFlight {
    _guard: OwnedMutexGuard<()>,
}

/// Normalizes a path into an absolute key.
///
/// The existing part of the path is canonicalized so that symlinks and `..`
/// resolve to the same key; a missing file name is appended lexically.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;

    if let Ok(canonical) = absolute.canonicalize() {
        return Ok(canonical);
    }

    let lexical = lexical_clean(&absolute);
    match (lexical.parent(), lexical.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => Ok(parent.join(name)),
            Err(_) => Ok(lexical),
        },
        _ => Ok(lexical),
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

//! # trackfile storage
//!
//! Low-level file access for trackfile stores.
//!
//! This crate knows nothing about entities or record formats. It provides:
//!
//! - [`LockedFile`] - a whole-file handle holding a shared or exclusive OS lock
//! - [`LockPolicy`] - bounded retry/backoff used while the OS lock is contended
//! - [`FileGate`] - the process-local gate and in-flight transaction signal of
//!   one physical file, shared by every store that points at that file
//!
//! ## Locking Model
//!
//! - Within a process, a [`FileGate`] serializes handle creation and lets
//!   readers wait until an in-flight write transaction has finished.
//! - Across processes, exclusivity is enforced by the OS lock taken in
//!   [`LockedFile::try_open_exclusive`].
//!
//! ## Example
//!
//! ```no_run
//! use trackfile_storage::LockedFile;
//! use std::path::Path;
//!
//! let mut file = LockedFile::try_open_exclusive(Path::new("people.json")).unwrap();
//! file.overwrite(b"[]").unwrap();
//! file.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod gate;
mod policy;

pub use error::{StorageError, StorageResult};
pub use file::{LockMode, LockedFile};
pub use gate::{normalize_path, FileGate, GateGuard, InFlight};
pub use policy::{open_exclusive_with_retry, open_shared_with_retry, LockPolicy};

//! # trackfile core
//!
//! Change tracking, unit of work and file-backed data sets.
//!
//! This crate provides:
//! - [`ChangeTracker`] - per-instance lifecycle states with snapshot-based
//!   dirty detection
//! - [`FileStorageContext`] - a unit of work that saves every pending change,
//!   grouped by the data set that owns it
//! - File data sets - one entity per file, a single entity in one file, and
//!   all entities of a type in one file committed all-or-nothing
//! - [`saga::Saga`] - ordered steps across independent units of work with
//!   reverse-order compensation
//!
//! ## Example
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use tokio_util::sync::CancellationToken;
//! use trackfile_core::{Entity, FileStorageContext, StoreConfig, Tracked, TransactionalFileDataSet, UnitOfWork};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Person {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl Entity for Person {
//!     type Id = u64;
//!
//!     fn id(&self) -> u64 {
//!         self.id
//!     }
//! }
//!
//! # async fn run() -> Result<(), trackfile_core::CoreError> {
//! let context = FileStorageContext::new();
//! let people = TransactionalFileDataSet::<Person>::open(
//!     context.change_tracker(),
//!     "people.json",
//!     StoreConfig::default(),
//! )?;
//!
//! people.add_entity(&Tracked::new(Person { id: 1, name: "Ada".into() }));
//! context.save_tracked_changes(&CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod error;
pub mod fs;
mod pagination;
pub mod saga;
pub mod tracking;
pub mod uow;

pub use config::StoreConfig;
pub use context::{save_tracker, FileStorageContext};
pub use error::{CoreError, CoreResult, EntityOperationError};
pub use fs::{
    EntityPathResolver, FolderResolver, JsonFileDataSet, SingleEntityFileDataSet,
    TransactionalFileDataSet,
};
pub use pagination::paginate;
pub use saga::{Compensation, EntityContext, Saga, SagaError};
pub use tracking::{AnyTracked, ChangeTracker, Entity, InstanceKey, Trackable, Tracked, TrackingState};
pub use uow::{
    DataSet, EntityOperationErrorCode, EntityOperationFailure, EntityRepository,
    StandaloneRepository, TransactionalDataSet, UnitOfWork,
};

// Re-export codec/storage types that appear in this crate's API.
pub use trackfile_codec::Format;
pub use trackfile_storage::{FileGate, LockPolicy};

//! Unit of work.
//!
//! Data sets turn tracker entries into persistence operations; a
//! [`UnitOfWork`] runs them for every pending entry of its tracker and
//! finalizes the entries that were persisted.

mod data_set;
mod failure;
mod unit_of_work;

pub use data_set::{noop_operation, BoxFuture, DataSet, EntityOperation, TransactionalDataSet};
pub use failure::{EntityOperationErrorCode, EntityOperationFailure};
pub use unit_of_work::{EntityRepository, StandaloneRepository, UnitOfWork};

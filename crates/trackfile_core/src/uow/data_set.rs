//! The data set abstraction.

use super::failure::EntityOperationFailure;
use crate::error::CoreResult;
use crate::tracking::TrackerEntry;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A deferred persistence action for one tracker entry.
///
/// Nothing happens until the future is polled. It resolves to `Ok(None)` on
/// success, `Ok(Some(failure))` on a business failure and `Err(_)` on an
/// infrastructure failure.
pub type EntityOperation = BoxFuture<'static, CoreResult<Option<EntityOperationFailure>>>;

/// A store that can persist changes of tracked entries.
pub trait DataSet: Send + Sync {
    /// Returns the deferred operation realizing the entry's pending change.
    ///
    /// `Unchanged` and `Detached` entries get a no-op operation.
    fn operation_for(self: Arc<Self>, entry: Arc<dyn TrackerEntry>) -> EntityOperation;

    /// Returns the batch API if this data set persists changes as one
    /// transaction.
    fn as_transactional(&self) -> Option<&dyn TransactionalDataSet> {
        None
    }
}

/// A data set that applies all pending changes of a save atomically.
///
/// The orchestrator calls `begin_transaction`, then
/// `add_entity_change_to_transaction` once per entry, then
/// `commit_transaction`.
#[async_trait]
pub trait TransactionalDataSet: Send + Sync {
    /// Starts a transaction, waiting for exclusive access to the store.
    async fn begin_transaction(&self) -> CoreResult<()>;

    /// Adds an entry to the running transaction.
    fn add_entity_change_to_transaction(&self, entry: Arc<dyn TrackerEntry>);

    /// Applies the pending changes all-or-nothing and ends the transaction.
    ///
    /// Returns the business failures; an empty list means everything was
    /// persisted.
    async fn commit_transaction(&self) -> CoreResult<Vec<EntityOperationFailure>>;
}

/// Returns an operation that does nothing and succeeds.
#[must_use]
pub fn noop_operation() -> EntityOperation {
    Box::pin(async { Ok(None) })
}

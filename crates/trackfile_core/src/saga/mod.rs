//! Sagas across independent units of work.
//!
//! A [`Saga`] runs an ordered list of steps. Each step applies a forward
//! action to the repository of one entity type and then saves that type's
//! unit of work. When a step fails, every step that already completed is
//! compensated in reverse order: its compensation (if any) runs and its unit
//! of work is saved again.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use trackfile_core::saga::{Compensation, EntityContext, Saga};
//! use trackfile_core::{EntityRepository, Tracked, UnitOfWork};
//!
//! # #[derive(Clone, PartialEq)] struct Order;
//! # async fn run(
//! #     orders: Arc<dyn EntityRepository<Order>>,
//! #     uow: Arc<dyn UnitOfWork>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let order = Tracked::new(Order);
//! let mut saga = Saga::new().with_context(EntityContext::new(orders, uow));
//!
//! let added = order.clone();
//! let removed = order.clone();
//! saga.add_sync_operation::<Order, _>(
//!     move |repo| {
//!         repo.add_entity(&added);
//!         Ok(())
//!     },
//!     Some(Compensation::blocking(move |repo| {
//!         repo.remove_entity(&removed);
//!         Ok(())
//!     })),
//! )?;
//!
//! saga.save_tracked_changes(&CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod operation;

pub use error::{BoxError, SagaError, SagaResult};
pub use operation::{Compensation, EntityContext};

use crate::error::CoreError;
use crate::tracking::Trackable;
use crate::uow::EntityRepository;
use operation::Operation;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// An ordered sequence of steps with reverse-order compensation.
#[derive(Default)]
pub struct Saga {
    contexts: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    operations: Vec<Operation>,
}

impl Saga {
    /// Creates an empty saga.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the context of entity type `T`, replacing any earlier one.
    pub fn register<T: Trackable>(&mut self, context: EntityContext<T>) {
        self.contexts.insert(TypeId::of::<T>(), Box::new(context));
    }

    /// Registers the context of entity type `T` (builder pattern).
    #[must_use]
    pub fn with_context<T: Trackable>(mut self, context: EntityContext<T>) -> Self {
        self.register(context);
        self
    }

    /// Returns true if a context is registered for `T`.
    #[must_use]
    pub fn knows<T: Trackable>(&self) -> bool {
        self.contexts.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if no step is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Appends an asynchronous step for entity type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::UnknownEntityType`] if no context is registered
    /// for `T`.
    pub fn add_operation<T, F, Fut>(
        &mut self,
        forward: F,
        compensation: Option<Compensation<T>>,
    ) -> SagaResult<()>
    where
        T: Trackable,
        F: Fn(Arc<dyn EntityRepository<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let operation = Operation::new(self.context::<T>()?, forward, compensation);
        self.operations.push(operation);
        Ok(())
    }

    /// Appends a blocking step for entity type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::UnknownEntityType`] if no context is registered
    /// for `T`.
    pub fn add_sync_operation<T, F>(
        &mut self,
        forward: F,
        compensation: Option<Compensation<T>>,
    ) -> SagaResult<()>
    where
        T: Trackable,
        F: Fn(&dyn EntityRepository<T>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add_operation::<T, _, _>(
            move |repository: Arc<dyn EntityRepository<T>>| std::future::ready(forward(&*repository)),
            compensation,
        )
    }

    /// Runs every step in order.
    ///
    /// On the first failing step (forward action or save), the completed
    /// steps are compensated in reverse order with a fresh, never-cancelled
    /// token. Rollback runs in a spawned task and finishes even if this
    /// future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Failed`] carrying the step's error and every
    /// compensation error.
    pub async fn save_tracked_changes(&self, cancel: &CancellationToken) -> SagaResult<()> {
        let mut failure = None;
        for (index, operation) in self.operations.iter().enumerate() {
            if let Err(err) = run_forward(operation, cancel).await {
                failure = Some((index, err));
                break;
            }
        }

        let Some((failed, source)) = failure else {
            debug!(steps = self.operations.len(), "saga completed");
            return Ok(());
        };

        info!(
            step = failed,
            entity_type = self.operations[failed].type_name,
            error = %source,
            "saga step failed, rolling back"
        );

        let committed: Vec<Operation> = self.operations[..failed].iter().rev().cloned().collect();
        let rollback_errors = match tokio::spawn(rollback(committed)).await {
            Ok(errors) => errors,
            Err(err) => vec![Box::new(CoreError::from(err)) as BoxError],
        };

        Err(SagaError::Failed {
            source,
            rollback_errors,
        })
    }

    fn context<T: Trackable>(&self) -> SagaResult<&EntityContext<T>> {
        self.contexts
            .get(&TypeId::of::<T>())
            .and_then(|context| context.downcast_ref::<EntityContext<T>>())
            .ok_or(SagaError::UnknownEntityType {
                type_name: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for Saga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<_> = self.operations.iter().map(|op| op.type_name).collect();
        f.debug_struct("Saga")
            .field("contexts", &self.contexts.len())
            .field("steps", &steps)
            .finish()
    }
}

async fn run_forward(operation: &Operation, cancel: &CancellationToken) -> Result<(), BoxError> {
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled.into());
    }
    (operation.forward)().await?;
    operation.unit_of_work.save_tracked_changes(cancel).await?;
    Ok(())
}

async fn rollback(committed: Vec<Operation>) -> Vec<BoxError> {
    let token = CancellationToken::new();
    let mut errors = Vec::new();

    for operation in committed {
        if let Err(err) = compensate(&operation, &token).await {
            warn!(
                entity_type = operation.type_name,
                error = %err,
                "saga compensation failed"
            );
            errors.push(err);
        }
    }
    errors
}

async fn compensate(operation: &Operation, token: &CancellationToken) -> Result<(), BoxError> {
    if let Some(compensation) = &operation.compensation {
        compensation().await?;
    }
    operation.unit_of_work.save_tracked_changes(token).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreResult;
    use crate::tracking::Tracked;
    use crate::uow::UnitOfWork;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str);

    #[derive(Debug, Clone, PartialEq)]
    struct Other;

    struct LogRepository {
        log: Log,
    }

    impl EntityRepository<Item> for LogRepository {
        fn add_entity(&self, entity: &Tracked<Item>) {
            self.log.lock().push(format!("add {}", entity.read().0));
        }

        fn update_entity(&self, entity: &Tracked<Item>) {
            self.log.lock().push(format!("update {}", entity.read().0));
        }

        fn remove_entity(&self, entity: &Tracked<Item>) {
            self.log.lock().push(format!("remove {}", entity.read().0));
        }
    }

    impl EntityRepository<Other> for LogRepository {
        fn add_entity(&self, _entity: &Tracked<Other>) {}

        fn update_entity(&self, _entity: &Tracked<Other>) {}

        fn remove_entity(&self, _entity: &Tracked<Other>) {}
    }

    struct LogUnitOfWork {
        log: Log,
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl UnitOfWork for LogUnitOfWork {
        async fn save_tracked_changes(&self, cancel: &CancellationToken) -> CoreResult<()> {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            self.log.lock().push(format!("save {}", self.name));
            if self.fail {
                return Err(CoreError::invalid_operation("save failed"));
            }
            Ok(())
        }
    }

    fn saga(log: &Log) -> Saga {
        let repository = Arc::new(LogRepository {
            log: Arc::clone(log),
        });
        let items = Arc::new(LogUnitOfWork {
            log: Arc::clone(log),
            name: "items",
            fail: false,
        });
        let others = Arc::new(LogUnitOfWork {
            log: Arc::clone(log),
            name: "others",
            fail: true,
        });

        Saga::new()
            .with_context(EntityContext::<Item>::new(repository.clone(), items))
            .with_context(EntityContext::<Other>::new(repository, others))
    }

    fn step(
        log: &Log,
        name: &'static str,
        outcome: Result<(), &'static str>,
    ) -> impl Fn(Arc<dyn EntityRepository<Item>>) -> std::future::Ready<Result<(), BoxError>>
           + Send
           + Sync
           + 'static {
        let log = Arc::clone(log);
        move |_repository| {
            log.lock().push(name.to_string());
            std::future::ready(outcome.map_err(BoxError::from))
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().clone()
    }

    #[tokio::test]
    async fn steps_run_in_order_with_saves() {
        let log = Log::default();
        let mut saga = saga(&log);
        saga.add_operation(step(&log, "op1", Ok(())), None).unwrap();
        saga.add_operation(step(&log, "op2", Ok(())), None).unwrap();

        saga.save_tracked_changes(&CancellationToken::new()).await.unwrap();
        assert_eq!(entries(&log), vec!["op1", "save items", "op2", "save items"]);
    }

    #[tokio::test]
    async fn failure_compensates_committed_prefix_only() {
        let log = Log::default();
        let mut saga = saga(&log);
        saga.add_operation(
            step(&log, "op1", Ok(())),
            Some(Compensation::new(step(&log, "comp1", Ok(())))),
        )
        .unwrap();
        saga.add_operation(step(&log, "op2", Err("op2 failed")), None).unwrap();
        saga.add_operation(
            step(&log, "op3", Ok(())),
            Some(Compensation::new(step(&log, "comp3", Ok(())))),
        )
        .unwrap();

        let err = saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
        let SagaError::Failed {
            source,
            rollback_errors,
        } = err
        else {
            panic!("expected a failed saga");
        };

        assert_eq!(source.to_string(), "op2 failed");
        assert!(rollback_errors.is_empty());
        assert_eq!(
            entries(&log),
            vec!["op1", "save items", "op2", "comp1", "save items"]
        );
    }

    #[tokio::test]
    async fn compensation_errors_are_collected() {
        let log = Log::default();
        let mut saga = saga(&log);
        saga.add_operation(
            step(&log, "op1", Ok(())),
            Some(Compensation::new(step(&log, "comp1", Ok(())))),
        )
        .unwrap();
        saga.add_operation(
            step(&log, "op2", Ok(())),
            Some(Compensation::new(step(&log, "comp2", Err("comp2 failed")))),
        )
        .unwrap();
        saga.add_operation(step(&log, "op3", Err("op3 failed")), None).unwrap();

        let err = saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.rollback_errors().len(), 1);
        assert_eq!(err.rollback_errors()[0].to_string(), "comp2 failed");

        let log = entries(&log);
        let tail: Vec<_> = log.iter().skip(5).map(String::as_str).collect();
        assert_eq!(tail, vec!["comp2", "comp1", "save items"]);
    }

    #[tokio::test]
    async fn step_without_compensation_is_still_saved_on_rollback() {
        let log = Log::default();
        let mut saga = saga(&log);
        saga.add_operation(step(&log, "op1", Ok(())), None).unwrap();
        saga.add_operation(step(&log, "op2", Err("boom")), None).unwrap();

        saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(entries(&log), vec!["op1", "save items", "op2", "save items"]);
    }

    #[tokio::test]
    async fn failed_save_triggers_rollback() {
        let log = Log::default();
        let mut saga = saga(&log);
        saga.add_operation(
            step(&log, "op1", Ok(())),
            Some(Compensation::new(step(&log, "comp1", Ok(())))),
        )
        .unwrap();
        saga.add_sync_operation::<Other, _>(|_repository| Ok(()), None).unwrap();

        let err = saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
        let SagaError::Failed { source, .. } = err else {
            panic!("expected a failed saga");
        };
        assert!(source.to_string().contains("save failed"));
        assert_eq!(
            entries(&log),
            vec!["op1", "save items", "save others", "comp1", "save items"]
        );
    }

    #[tokio::test]
    async fn sync_steps_use_the_repository() {
        let log = Log::default();
        let mut saga = saga(&log);
        let item = Tracked::new(Item("a"));

        let added = item.clone();
        let removed = item.clone();
        saga.add_sync_operation::<Item, _>(
            move |repository| {
                repository.add_entity(&added);
                Ok(())
            },
            Some(Compensation::blocking(move |repository| {
                repository.remove_entity(&removed);
                Ok(())
            })),
        )
        .unwrap();
        saga.add_operation(step(&log, "op2", Err("boom")), None).unwrap();

        saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            entries(&log),
            vec!["add a", "save items", "op2", "remove a", "save items"]
        );
    }

    #[tokio::test]
    async fn cancelled_saga_runs_no_steps() {
        let log = Log::default();
        let mut saga = saga(&log);
        saga.add_operation(step(&log, "op1", Ok(())), None).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = saga.save_tracked_changes(&cancel).await.unwrap_err();
        assert!(matches!(err, SagaError::Failed { .. }));
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        #[derive(Clone, PartialEq)]
        struct Unregistered;

        let mut saga = Saga::new();
        let err = saga
            .add_sync_operation::<Unregistered, _>(|_repository| Ok(()), None)
            .unwrap_err();
        assert!(matches!(err, SagaError::UnknownEntityType { .. }));
        assert!(saga.is_empty());
        assert!(!saga.knows::<Unregistered>());
    }
}

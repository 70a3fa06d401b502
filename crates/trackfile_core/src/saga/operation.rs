//! Saga steps and the contexts they run against.

use super::error::BoxError;
use crate::tracking::Trackable;
use crate::uow::{BoxFuture, EntityRepository, StandaloneRepository, UnitOfWork};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub(crate) type StepFuture = BoxFuture<'static, Result<(), BoxError>>;
pub(crate) type StepFn = Arc<dyn Fn() -> StepFuture + Send + Sync>;

type RepositoryFn<T> = Arc<dyn Fn(Arc<dyn EntityRepository<T>>) -> StepFuture + Send + Sync>;

/// The repository and unit of work a saga uses for one entity type.
pub struct EntityContext<T: Trackable> {
    pub(crate) repository: Arc<dyn EntityRepository<T>>,
    pub(crate) unit_of_work: Arc<dyn UnitOfWork>,
}

impl<T: Trackable> EntityContext<T> {
    /// Creates a context from a repository and the unit of work that
    /// persists its changes.
    pub fn new(repository: Arc<dyn EntityRepository<T>>, unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        Self {
            repository,
            unit_of_work,
        }
    }

    /// Creates a context from a repository that is its own unit of work.
    pub fn standalone<R>(repository: Arc<R>) -> Self
    where
        R: StandaloneRepository<T> + 'static,
    {
        Self {
            repository: Arc::clone(&repository) as Arc<dyn EntityRepository<T>>,
            unit_of_work: repository,
        }
    }
}

impl<T: Trackable> Clone for EntityContext<T> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            unit_of_work: Arc::clone(&self.unit_of_work),
        }
    }
}

impl<T: Trackable> fmt::Debug for EntityContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContext")
            .field("entity_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// Undoes the effect of a saga step through the step's repository.
pub struct Compensation<T: Trackable> {
    action: RepositoryFn<T>,
}

impl<T: Trackable> Compensation<T> {
    /// Creates an asynchronous compensation.
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: Fn(Arc<dyn EntityRepository<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            action: Arc::new(move |repository: Arc<dyn EntityRepository<T>>| -> StepFuture {
                Box::pin(action(repository))
            }),
        }
    }

    /// Creates a compensation from a blocking closure.
    pub fn blocking<F>(action: F) -> Self
    where
        F: Fn(&dyn EntityRepository<T>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::new(move |repository: Arc<dyn EntityRepository<T>>| {
            std::future::ready(action(&*repository))
        })
    }

    pub(crate) fn bind(self, repository: Arc<dyn EntityRepository<T>>) -> StepFn {
        let action = self.action;
        Arc::new(move || -> StepFuture { action(Arc::clone(&repository)) })
    }
}

impl<T: Trackable> fmt::Debug for Compensation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compensation").finish_non_exhaustive()
    }
}

/// One registered step: a forward action, its optional compensation and the
/// unit of work saved after each of them.
#[derive(Clone)]
pub(crate) struct Operation {
    pub(crate) type_name: &'static str,
    pub(crate) unit_of_work: Arc<dyn UnitOfWork>,
    pub(crate) forward: StepFn,
    pub(crate) compensation: Option<StepFn>,
}

impl Operation {
    pub(crate) fn new<T, F, Fut>(
        context: &EntityContext<T>,
        forward: F,
        compensation: Option<Compensation<T>>,
    ) -> Self
    where
        T: Trackable,
        F: Fn(Arc<dyn EntityRepository<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let repository = Arc::clone(&context.repository);
        let forward_repository = Arc::clone(&repository);

        Self {
            type_name: std::any::type_name::<T>(),
            unit_of_work: Arc::clone(&context.unit_of_work),
            forward: Arc::new(move || -> StepFuture {
                Box::pin(forward(Arc::clone(&forward_repository)))
            }),
            compensation: compensation.map(|compensation| compensation.bind(repository)),
        }
    }
}

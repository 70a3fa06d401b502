//! Sagas spanning independent units of work.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trackfile_core::saga::{BoxError, Compensation, EntityContext, Saga, SagaError};
use trackfile_core::{
    CoreResult, EntityOperationErrorCode, EntityRepository, FileStorageContext, Format,
    SingleEntityFileDataSet, StoreConfig, Tracked, TransactionalFileDataSet, UnitOfWork,
};
use trackfile_testkit::prelude::*;
use uuid::Uuid;

#[tokio::test]
async fn failed_step_compensates_committed_store() {
    let dir = TestDir::new();
    std::fs::write(dir.file("settings.json"), br#"{"environment":"prod","page_size":10,"features":[]}"#)
        .unwrap();

    let people_context = FileStorageContext::new();
    let people = TransactionalFileDataSet::<Person>::open(
        people_context.change_tracker(),
        dir.file("people.json"),
        StoreConfig::default(),
    )
    .unwrap();

    let settings_context = FileStorageContext::new();
    let settings = SingleEntityFileDataSet::<AppSettings>::new(
        settings_context.change_tracker(),
        dir.file("settings.json"),
        StoreConfig::default(),
    );

    let mut saga = Saga::new()
        .with_context(EntityContext::<Person>::new(people.clone(), Arc::new(people_context)))
        .with_context(EntityContext::<AppSettings>::new(settings, Arc::new(settings_context)));

    let person = Person::tracked("ada", 36);
    let (added, removed) = (person.clone(), person.clone());
    saga.add_sync_operation::<Person, _>(
        move |repo| {
            repo.add_entity(&added);
            Ok(())
        },
        Some(Compensation::blocking(move |repo| {
            repo.remove_entity(&removed);
            Ok(())
        })),
    )
    .unwrap();

    let fresh = Tracked::new(AppSettings::default());
    saga.add_operation::<AppSettings, _, _>(
        move |repo: Arc<dyn EntityRepository<AppSettings>>| {
            let fresh = fresh.clone();
            async move {
                repo.add_entity(&fresh);
                Ok::<_, BoxError>(())
            }
        },
        None,
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

    let cause = source
        .downcast_ref::<trackfile_core::CoreError>()
        .and_then(trackfile_core::CoreError::failures)
        .unwrap();
    assert_eq!(cause[0].error_code(), EntityOperationErrorCode::EntityAlreadyExists);
    assert!(rollback_errors.is_empty());

    let records: Vec<trackfile_codec::Record<Uuid, Person>> =
        read_records(&dir.file("people.json"), Format::Json);
    assert!(records.is_empty());
}

#[tokio::test]
async fn steps_commit_in_order_and_roll_back_in_reverse() {
    let log = EventLog::default();
    let people_repo = RecordingRepository::<Person>::new("people", &log);
    let people_uow = RecordingUnitOfWork::new("people", &log);
    let settings_repo = RecordingRepository::<AppSettings>::new("settings", &log);
    let settings_uow = RecordingUnitOfWork::new("settings", &log);
    settings_uow.set_failing(true);

    let mut saga = Saga::new()
        .with_context(EntityContext::<Person>::new(people_repo.clone(), people_uow.clone()))
        .with_context(EntityContext::<AppSettings>::new(settings_repo, settings_uow.clone()));

    let person = Person::tracked("grace", 45);
    let (first, second) = (person.clone(), person.clone());
    saga.add_sync_operation::<Person, _>(
        move |repo| {
            repo.add_entity(&first);
            Ok(())
        },
        Some(Compensation::blocking(move |repo| {
            repo.remove_entity(&second);
            Ok(())
        })),
    )
    .unwrap();
    saga.add_sync_operation::<AppSettings, _>(
        |repo| {
            repo.update_entity(&Tracked::new(AppSettings::default()));
            Ok(())
        },
        Some(Compensation::blocking(|_repo| Err("never called".into()))),
    )
    .unwrap();

    let err = saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
    assert!(err.rollback_errors().is_empty());

    assert_eq!(
        events(&log),
        vec![
            "add people",
            "save people",
            "update settings",
            "save settings",
            "remove people",
            "save people",
        ]
    );
    assert_eq!(people_uow.saves(), 2);
    assert_eq!(settings_uow.saves(), 1);
    assert_eq!(
        people_repo.calls().into_iter().map(|(call, _)| call).collect::<Vec<_>>(),
        vec![RepositoryCall::Add, RepositoryCall::Remove]
    );
}

#[tokio::test]
async fn rollback_save_failure_is_collected() {
    let log = EventLog::default();
    let people_uow = RecordingUnitOfWork::new("people", &log);
    let settings_uow = RecordingUnitOfWork::new("settings", &log);

    let mut saga = Saga::new()
        .with_context(EntityContext::<Person>::new(
            RecordingRepository::<Person>::new("people", &log),
            people_uow.clone(),
        ))
        .with_context(EntityContext::<AppSettings>::new(
            RecordingRepository::<AppSettings>::new("settings", &log),
            settings_uow.clone(),
        ));

    saga.add_sync_operation::<Person, _>(|_repo| Ok(()), None).unwrap();
    saga.add_sync_operation::<AppSettings, _>(|_repo| Ok(()), None).unwrap();
    {
        let people_uow = people_uow.clone();
        saga.add_sync_operation::<Person, _>(
            move |_repo| {
                people_uow.set_failing(true);
                Err("third step failed".into())
            },
            None,
        )
        .unwrap();
    }

    let err = saga.save_tracked_changes(&CancellationToken::new()).await.unwrap_err();
    let SagaError::Failed {
        source,
        rollback_errors,
    } = err
    else {
        panic!("expected a failed saga");
    };

    assert_eq!(source.to_string(), "third step failed");
    assert_eq!(rollback_errors.len(), 1);
    assert_eq!(settings_uow.saves(), 2);
    assert_eq!(people_uow.saves(), 2);
}

/// A people store that saves its own changes.
struct PeopleStore {
    context: FileStorageContext,
    people: Arc<TransactionalFileDataSet<Person>>,
}

impl PeopleStore {
    fn open(dir: &TestDir) -> Arc<Self> {
        let context = FileStorageContext::new();
        let people = TransactionalFileDataSet::open(
            context.change_tracker(),
            dir.file("people.json"),
            StoreConfig::default(),
        )
        .unwrap();
        Arc::new(Self { context, people })
    }
}

impl EntityRepository<Person> for PeopleStore {
    fn add_entity(&self, entity: &Tracked<Person>) {
        self.people.add_entity(entity);
    }

    fn update_entity(&self, entity: &Tracked<Person>) {
        self.people.update_entity(entity);
    }

    fn remove_entity(&self, entity: &Tracked<Person>) {
        self.people.delete_entity(entity);
    }
}

#[async_trait]
impl UnitOfWork for PeopleStore {
    async fn save_tracked_changes(&self, cancel: &CancellationToken) -> CoreResult<()> {
        self.context.save_tracked_changes(cancel).await
    }
}

#[tokio::test]
async fn standalone_repository_saves_and_compensates() {
    let dir = TestDir::new();
    let store = PeopleStore::open(&dir);
    let mut saga = Saga::new().with_context(EntityContext::<Person>::standalone(Arc::clone(&store)));

    let person = Person::tracked("ada", 36);
    let (added, removed) = (person.clone(), person.clone());
    saga.add_sync_operation::<Person, _>(
        move |repo| {
            repo.add_entity(&added);
            Ok(())
        },
        Some(Compensation::blocking(move |repo| {
            repo.remove_entity(&removed);
            Ok(())
        })),
    )
    .unwrap();

    let path = dir.file("people.json");
    saga.add_sync_operation::<Person, _>(
        move |_repo| {
            let committed: Vec<trackfile_codec::Record<Uuid, Person>> = read_records(&path, Format::Json);
            Err(format!("{} committed", committed.len()).into())
        },
        None,
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
    assert_eq!(source.to_string(), "1 committed");
    assert!(rollback_errors.is_empty());

    assert!(store.people.get_entities(0, 1, false).await.unwrap().is_empty());
    assert_eq!(store.context.change_tracker().state_of(&person), None);
}

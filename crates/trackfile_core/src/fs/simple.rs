//! One-file-per-entity operations shared by the simple data sets.

use crate::config::StoreConfig;
use crate::error::CoreResult;
use crate::tracking::AnyTracked;
use crate::uow::{EntityOperationErrorCode, EntityOperationFailure};
use serde::de::DeserializeOwned;
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use trackfile_codec::decode_value;

type OperationResult = CoreResult<Option<EntityOperationFailure>>;

/// Creates the file; fails if it already exists.
pub(crate) async fn add_file(entity: AnyTracked, path: &Path, contents: Vec<u8>) -> OperationResult {
    ensure_parent(path).await?;

    let created = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await;

    let mut file = match created {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(Some(
                EntityOperationFailure::new(entity, EntityOperationErrorCode::EntityAlreadyExists)
                    .with_message(format!("file '{}' already exists", path.display())),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    file.write_all(&contents).await?;
    file.sync_all().await?;
    Ok(None)
}

/// Overwrites the file; creates it only if upserts are allowed.
pub(crate) async fn update_file(
    entity: AnyTracked,
    path: &Path,
    contents: Vec<u8>,
    config: &StoreConfig,
) -> OperationResult {
    if !fs::try_exists(path).await? {
        if !config.allow_upsert {
            return Ok(Some(
                EntityOperationFailure::new(entity, EntityOperationErrorCode::EntityDoesNotExist)
                    .with_message(format!("file '{}' does not exist", path.display())),
            ));
        }
        ensure_parent(path).await?;
    }

    fs::write(path, contents).await?;
    Ok(None)
}

/// Removes the file; a missing file fails unless ignored by the config.
pub(crate) async fn delete_file(entity: AnyTracked, path: &Path, config: &StoreConfig) -> OperationResult {
    match fs::remove_file(path).await {
        Ok(()) => Ok(None),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if config.ignore_missing_on_delete {
                Ok(None)
            } else {
                Ok(Some(
                    EntityOperationFailure::new(entity, EntityOperationErrorCode::EntityDoesNotExist)
                        .with_message(format!("file '{}' does not exist", path.display())),
                ))
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Reads and decodes the entity stored at `path`, or `None` if missing.
pub(crate) async fn read_entity<T: DeserializeOwned>(
    path: &Path,
    config: &StoreConfig,
) -> CoreResult<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    Ok(Some(decode_value(config.format, &bytes)?))
}

async fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

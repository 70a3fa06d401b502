//! Mapping entity identifiers to file paths.

use crate::error::CoreResult;
use async_trait::async_trait;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;

/// Resolves where the file of an entity lives.
///
/// A resolver that can answer without waiting simply returns from its async
/// methods immediately.
#[async_trait]
pub trait EntityPathResolver<Id>: Send + Sync
where
    Id: Send + Sync,
{
    /// Returns the path of the entity with `id`.
    async fn path_for_id(&self, id: &Id) -> CoreResult<PathBuf>;

    /// Returns the paths of every entity in the store.
    async fn all_paths(&self) -> CoreResult<Vec<PathBuf>>;
}

/// Stores each entity as `{folder}/{id}.{extension}`.
#[derive(Debug, Clone)]
pub struct FolderResolver {
    folder: PathBuf,
    extension: String,
}

impl FolderResolver {
    /// Creates a resolver for `folder` and files ending in `extension`.
    pub fn new(folder: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            extension: extension.into(),
        }
    }
}

#[async_trait]
impl<Id> EntityPathResolver<Id> for FolderResolver
where
    Id: Display + Send + Sync,
{
    async fn path_for_id(&self, id: &Id) -> CoreResult<PathBuf> {
        Ok(self.folder.join(format!("{id}.{}", self.extension)))
    }

    async fn all_paths(&self) -> CoreResult<Vec<PathBuf>> {
        let mut dir = match tokio::fs::read_dir(&self.folder).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension));
            if matches && item.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

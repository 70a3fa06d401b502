//! Whole-file handles guarded by OS-level locks.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The kind of OS lock held by a [`LockedFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Other handles may read but nobody may write.
    Shared,
    /// No other handle may read or write.
    Exclusive,
}

/// A file handle that holds an OS lock for its whole lifetime.
///
/// Stores built on this handle always read and write the complete file:
/// `read_all` returns every byte and `overwrite` replaces the contents.
///
/// # Locking
///
/// - [`LockedFile::try_open_exclusive`] creates the file (and its parent
///   directory) if needed and takes an exclusive lock.
/// - [`LockedFile::try_open_shared`] opens an existing file read-only and takes
///   a shared lock.
///
/// Both fail with [`StorageError::LockContended`] instead of blocking when
/// another handle holds a conflicting lock. The lock is released on
/// [`LockedFile::close`] or when the handle is dropped.
///
/// # Example
///
/// ```no_run
/// use trackfile_storage::LockedFile;
/// use std::path::Path;
///
/// let mut file = LockedFile::try_open_exclusive(Path::new("data.json")).unwrap();
/// let before = file.read_all().unwrap();
/// file.overwrite(b"[]").unwrap();
/// file.close().unwrap();
/// # let _ = before;
/// ```
#[derive(Debug)]
pub struct LockedFile {
    path: PathBuf,
    file: File,
    mode: LockMode,
}

impl LockedFile {
    /// Opens or creates `path` for reading and writing with an exclusive lock.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LockContended`] if another handle holds a lock
    /// on the file, or an I/O error if the file cannot be opened.
    pub fn try_open_exclusive(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if let Err(err) = FileExt::try_lock_exclusive(&file) {
            return Err(map_lock_error(path, err));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mode: LockMode::Exclusive,
        })
    }

    /// Opens an existing file read-only with a shared lock.
    ///
    /// Returns `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LockContended`] if another handle holds an
    /// exclusive lock, or an I/O error if the file cannot be opened.
    pub fn try_open_shared(path: &Path) -> StorageResult<Option<Self>> {
        let file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = FileExt::try_lock_shared(&file) {
            return Err(map_lock_error(path, err));
        }

        Ok(Some(Self {
            path: path.to_path_buf(),
            file,
            mode: LockMode::Shared,
        }))
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the lock mode of this handle.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Returns the current length of the file in bytes.
    pub fn len(&self) -> StorageResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Returns true if the file is empty.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads the complete file contents.
    pub fn read_all(&mut self) -> StorageResult<Vec<u8>> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::new();
        self.file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Replaces the complete file contents with `data`.
    ///
    /// # Errors
    ///
    /// Fails with an I/O error if the handle is shared (read-only).
    pub fn overwrite(&mut self, data: &[u8]) -> StorageResult<()> {
        if self.mode == LockMode::Shared {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot write through shared handle for {}", self.path.display()),
            )));
        }

        self.file.seek(SeekFrom::Start(0))?;
        self.file.set_len(0)?;
        self.file.write_all(data)?;
        Ok(())
    }

    /// Flushes pending writes and syncs data and metadata to disk.
    pub fn flush(&mut self) -> StorageResult<()> {
        if self.mode == LockMode::Exclusive {
            self.file.flush()?;
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Releases the OS lock and closes the handle.
    pub fn close(self) -> StorageResult<()> {
        FileExt::unlock(&self.file)?;
        Ok(())
    }
}

/// Maps a failed lock attempt to a storage error.
fn map_lock_error(path: &Path, err: io::Error) -> StorageError {
    let contended = fs2::lock_contended_error();
    let is_contended = err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some() && err.raw_os_error() == contended.raw_os_error());

    if is_contended {
        StorageError::lock_contended(path)
    } else {
        StorageError::Io(err)
    }
}

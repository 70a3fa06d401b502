//! Bounded retry while an OS file lock is contended.

use crate::error::{StorageError, StorageResult};
use crate::file::LockedFile;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Retry behavior for acquiring an OS file lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Total wall-clock time allowed for acquiring the lock.
    pub timeout: Duration,
    /// Fixed delay between two attempts.
    pub retry_interval: Duration,
}

impl LockPolicy {
    /// Creates a lock policy.
    #[must_use]
    pub const fn new(timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            timeout,
            retry_interval,
        }
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_millis(100))
    }
}

/// Opens `path` with an exclusive lock, retrying while the lock is contended.
///
/// # Errors
///
/// Returns [`StorageError::LockTimeout`] once `policy.timeout` has elapsed, or
/// any non-contention error immediately.
pub async fn open_exclusive_with_retry(path: &Path, policy: LockPolicy) -> StorageResult<LockedFile> {
    retry(path, policy, || LockedFile::try_open_exclusive(path)).await
}

/// Opens `path` with a shared lock, retrying while the lock is contended.
///
/// Returns `None` if the file does not exist.
///
/// # Errors
///
/// Returns [`StorageError::LockTimeout`] once `policy.timeout` has elapsed, or
/// any non-contention error immediately.
pub async fn open_shared_with_retry(
    path: &Path,
    policy: LockPolicy,
) -> StorageResult<Option<LockedFile>> {
    retry(path, policy, || LockedFile::try_open_shared(path)).await
}

async fn retry<T>(
    path: &Path,
    policy: LockPolicy,
    mut attempt: impl FnMut() -> StorageResult<T>,
) -> StorageResult<T> {
    // a timeout past the clock's range waits without a deadline
    let deadline = Instant::now().checked_add(policy.timeout);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match attempt() {
            Ok(value) => {
                if attempts > 1 {
                    debug!(path = %path.display(), attempts, "acquired file lock after retrying");
                }
                return Ok(value);
            }
            Err(err) if err.is_contended() => {
                let next_attempt = Instant::now().checked_add(policy.retry_interval);
                if deadline.is_some_and(|deadline| next_attempt.is_none_or(|next| next > deadline)) {
                    warn!(path = %path.display(), attempts, "timed out waiting for file lock");
                    return Err(StorageError::LockTimeout {
                        path: path.to_path_buf(),
                        timeout: policy.timeout,
                    });
                }
                if attempts == 1 {
                    debug!(path = %path.display(), "file lock contended, retrying");
                }
                tokio::time::sleep(policy.retry_interval).await;
            }
            Err(err) => return Err(err),
        }
    }
}

//! Store configuration.

use std::time::Duration;
use trackfile_codec::Format;
use trackfile_storage::LockPolicy;

/// Configuration shared by the file data sets.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether an update of a missing entity creates it.
    pub allow_upsert: bool,

    /// Whether deleting a missing entity counts as success.
    pub ignore_missing_on_delete: bool,

    /// Serialization format of the store files.
    pub format: Format,

    /// Maximum time to wait for the OS file lock.
    pub lock_timeout: Duration,

    /// Delay between two OS lock attempts.
    pub lock_retry_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            allow_upsert: true,
            ignore_missing_on_delete: true,
            format: Format::Json,
            lock_timeout: Duration::from_secs(10),
            lock_retry_interval: Duration::from_millis(100),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that rejects upserts and missing deletes.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
            .allow_upsert(false)
            .ignore_missing_on_delete(false)
    }

    /// Sets whether updates of missing entities are allowed.
    #[must_use]
    pub const fn allow_upsert(mut self, value: bool) -> Self {
        self.allow_upsert = value;
        self
    }

    /// Sets whether deleting a missing entity is ignored.
    #[must_use]
    pub const fn ignore_missing_on_delete(mut self, value: bool) -> Self {
        self.ignore_missing_on_delete = value;
        self
    }

    /// Sets the serialization format.
    #[must_use]
    pub const fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the lock timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the lock retry interval.
    #[must_use]
    pub const fn lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    /// Returns the OS lock retry policy.
    #[must_use]
    pub const fn lock_policy(&self) -> LockPolicy {
        LockPolicy::new(self.lock_timeout, self.lock_retry_interval)
    }
}

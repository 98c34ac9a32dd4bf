/*!
Storage lifecycle for runs that persist into a database.

The engine itself (schema, queries) belongs to the backends; the orchestrator
only opens the handle before a run and closes it afterwards. [`StorageEngine`]
is the port, [`SqlStorage`] the MySQL/SQLite adapter, and
[`StorageResourceManager`] enforces acquire-once / release-at-most-once.
*/

pub mod sql;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{CrawlError, Result};

pub use sql::{SqlStorage, SqlTarget};

/// Upper bound on how long a release may take before it is abandoned
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Storage abstraction consumed by the orchestrator and the backends.
///
/// Implementations must tolerate `close` being called on a handle that was
/// never opened.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Short description for logs, e.g. `sqlite:data/crawlhub.db`
    fn describe(&self) -> String;

    /// Open the handle and validate it is usable
    async fn init(&mut self) -> Result<()>;

    /// Close the handle
    async fn close(&mut self) -> Result<()>;

    /// Check the open handle is still reachable
    async fn ping(&self) -> Result<()>;
}

/// Where the manager is in its acquire/release cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Idle,
    Acquired,
    Released,
}

/// What happened when storage release was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The storage mode does not use managed storage
    NotManaged,
    /// Nothing was held; release was a no-op
    NotHeld,
    /// Handle closed cleanly
    Closed,
    /// Close failed or timed out; logged and otherwise ignored
    TeardownFailed(String),
}

/// Owns the storage engine for one run
pub struct StorageResourceManager {
    engine: Box<dyn StorageEngine>,
    state: StorageState,
    release_timeout: Duration,
}

impl StorageResourceManager {
    pub fn new(engine: Box<dyn StorageEngine>) -> Self {
        Self {
            engine,
            state: StorageState::Idle,
            release_timeout: RELEASE_TIMEOUT,
        }
    }

    /// Override how long release may block
    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }

    pub fn state(&self) -> StorageState {
        self.state
    }

    /// Open the storage handle. Allowed once per run.
    pub async fn acquire(&mut self) -> Result<()> {
        if self.state != StorageState::Idle {
            return Err(CrawlError::storage_init(format!(
                "storage {} was already acquired in this run",
                self.engine.describe()
            )));
        }

        debug!(storage = %self.engine.describe(), "acquiring storage");
        self.engine.init().await.map_err(|e| match e {
            CrawlError::StorageInit(_) => e,
            other => CrawlError::storage_init(other.to_string()),
        })?;

        self.state = StorageState::Acquired;
        info!(storage = %self.engine.describe(), "storage acquired");
        Ok(())
    }

    /// Borrow the open handle; `None` unless acquired and not yet released
    pub fn handle(&self) -> Option<&dyn StorageEngine> {
        match self.state {
            StorageState::Acquired => Some(self.engine.as_ref()),
            StorageState::Idle | StorageState::Released => None,
        }
    }

    /// Best-effort close. Never fails; safe to call any number of times.
    pub async fn release(&mut self) -> ReleaseOutcome {
        if self.state != StorageState::Acquired {
            debug!(state = ?self.state, "storage release skipped, nothing held");
            return ReleaseOutcome::NotHeld;
        }
        self.state = StorageState::Released;

        let describe = self.engine.describe();
        match tokio::time::timeout(self.release_timeout, self.engine.close()).await {
            Ok(Ok(())) => {
                info!(storage = %describe, "storage released");
                ReleaseOutcome::Closed
            }
            Ok(Err(e)) => {
                let err = match e {
                    CrawlError::StorageTeardown(_) => e,
                    other => CrawlError::storage_teardown(other.to_string()),
                };
                warn!(storage = %describe, error = %err, "storage release failed");
                ReleaseOutcome::TeardownFailed(err.to_string())
            }
            Err(_) => {
                let err = CrawlError::storage_teardown(format!(
                    "close did not finish within {:?}",
                    self.release_timeout
                ));
                warn!(storage = %describe, error = %err, "storage release timed out");
                ReleaseOutcome::TeardownFailed(err.to_string())
            }
        }
    }
}

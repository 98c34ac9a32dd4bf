/*!
Lifecycle driver for a single crawl run.

The driver validates the configuration, opens managed storage when the
storage mode needs it, constructs the platform backend, runs it, and closes
storage again. Storage release is attempted on every path out of the run
(success, backend failure, interrupt) once the handle has been acquired.

```text
Configuring ─┬─> StorageAcquiring ─┐
             └─────────────────────┴─> BackendResolving ─> Running ─┬─> StorageReleasing ─┬─> Done
                                                                    └─────────────────────┘
any state ─> Failed | Interrupted
```
*/

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[cfg(feature = "metrics")]
use crate::observability::CrawlMetrics;

use crate::backend::RunContext;
use crate::config::{CrawlerConfig, SaveDataOption};
use crate::platform::Platform;
use crate::registry::PlatformRegistry;
use crate::storage::{ReleaseOutcome, SqlStorage, StorageEngine, StorageResourceManager};
use crate::{CrawlError, Result};

/// Driver states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Configuring,
    StorageAcquiring,
    BackendResolving,
    Running,
    StorageReleasing,
    Done,
    Failed,
    Interrupted,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Done | LifecycleState::Failed | LifecycleState::Interrupted
        )
    }
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub platform: Platform,
    pub save_data_option: SaveDataOption,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub storage: ReleaseOutcome,
    pub transitions: Vec<LifecycleState>,
}

/// Runs one backend from configuration to teardown
pub struct LifecycleDriver<'r> {
    config: Arc<CrawlerConfig>,
    registry: &'r PlatformRegistry,
    storage_engine: Option<Box<dyn StorageEngine>>,
    run_id: Uuid,
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl LifecycleDriver<'static> {
    /// Driver over the built-in platform registry
    pub fn new(config: Arc<CrawlerConfig>) -> Self {
        LifecycleDriver::with_registry(config, PlatformRegistry::builtin())
    }
}

impl<'r> LifecycleDriver<'r> {
    pub fn with_registry(config: Arc<CrawlerConfig>, registry: &'r PlatformRegistry) -> Self {
        Self {
            config,
            registry,
            storage_engine: None,
            run_id: Uuid::new_v4(),
            state: LifecycleState::Configuring,
            history: Vec::new(),
        }
    }

    /// Use this engine instead of building one from the configuration.
    ///
    /// Only consulted when the storage mode requires managed storage.
    pub fn with_storage_engine(mut self, engine: Box<dyn StorageEngine>) -> Self {
        self.storage_engine = Some(engine);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    /// Execute the run. A driver can only be executed once.
    pub async fn execute(&mut self, cancel: CancellationToken) -> Result<RunReport> {
        if !self.history.is_empty() {
            return Err(CrawlError::configuration(
                "lifecycle driver has already been executed",
            ));
        }

        let started_at = Utc::now();
        self.enter(LifecycleState::Configuring);
        #[cfg(feature = "metrics")]
        CrawlMetrics::global().record_run_started();

        if let Err(e) = self.config.validate() {
            return Err(self.fail(e));
        }
        let registry = self.registry;
        let entry = match registry.lookup(&self.config.platform) {
            Ok(entry) => entry,
            Err(e) => return Err(self.fail(e)),
        };
        if cancel.is_cancelled() {
            return Err(self.fail(CrawlError::Interrupted));
        }

        let mut storage = None;
        if self.config.save_data_option.requires_storage() {
            self.enter(LifecycleState::StorageAcquiring);
            let engine = match self.storage_engine.take() {
                Some(engine) => engine,
                None => match SqlStorage::from_config(&self.config) {
                    Ok(sql) => Box::new(sql) as Box<dyn StorageEngine>,
                    Err(e) => return Err(self.fail(e)),
                },
            };

            let mut manager = StorageResourceManager::new(engine);
            let acquire_started = Instant::now();
            let acquired = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CrawlError::Interrupted),
                result = manager.acquire() => result,
            };
            #[cfg(feature = "metrics")]
            CrawlMetrics::global().record_storage_acquire(acquire_started.elapsed());
            debug!(elapsed = ?acquire_started.elapsed(), "storage acquire finished");

            if let Err(e) = acquired {
                manager.release().await;
                return Err(self.fail(e));
            }
            storage = Some(manager);
        }

        self.enter(LifecycleState::BackendResolving);
        let mut backend = entry.construct(Arc::clone(&self.config));
        let platform = backend.platform();

        self.enter(LifecycleState::Running);
        info!(
            run_id = %self.run_id,
            platform = %platform,
            save = %self.config.save_data_option,
            "running {} backend",
            platform.display_name()
        );
        let run_started = Instant::now();
        let outcome = {
            let ctx = RunContext::new(storage.as_ref().and_then(|m| m.handle()), cancel.clone());
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CrawlError::Interrupted),
                result = backend.run(ctx) => result,
            }
        };
        drop(backend);
        #[cfg(feature = "metrics")]
        CrawlMetrics::global().record_run_duration(run_started.elapsed());
        debug!(elapsed = ?run_started.elapsed(), ok = outcome.is_ok(), "backend run finished");

        let release = match storage.as_mut() {
            Some(manager) => {
                self.enter(LifecycleState::StorageReleasing);
                manager.release().await
            }
            None => ReleaseOutcome::NotManaged,
        };

        match outcome {
            Ok(()) => {
                self.enter(LifecycleState::Done);
                info!(run_id = %self.run_id, platform = %platform, "run completed");
                Ok(RunReport {
                    run_id: self.run_id,
                    platform,
                    save_data_option: self.config.save_data_option,
                    started_at,
                    finished_at: Utc::now(),
                    storage: release,
                    transitions: self.history.clone(),
                })
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn enter(&mut self, state: LifecycleState) {
        debug!(run_id = %self.run_id, from = ?self.state, to = ?state, "lifecycle transition");
        self.state = state;
        self.history.push(state);
    }

    fn fail(&mut self, err: CrawlError) -> CrawlError {
        if err.is_interrupt() {
            self.enter(LifecycleState::Interrupted);
            warn!(run_id = %self.run_id, "run interrupted");
        } else {
            self.enter(LifecycleState::Failed);
            error!(run_id = %self.run_id, kind = err.kind(), error = %err, "run failed");
        }
        #[cfg(feature = "metrics")]
        CrawlMetrics::global().record_run_failure(err.kind());
        err
    }
}

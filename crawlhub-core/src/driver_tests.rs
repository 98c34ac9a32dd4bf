/*!
Tests for lifecycle sequencing, storage scoping and cancellation.
*/

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    use crate::backend::{CrawlerBackend, RunContext};
    use crate::config::{CrawlerConfig, SaveDataOption};
    use crate::driver::{LifecycleDriver, LifecycleState};
    use crate::platform::Platform;
    use crate::registry::PlatformRegistry;
    use crate::storage::{ReleaseOutcome, StorageEngine};
    use crate::{CrawlError, Result};

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    fn calls(log: &CallLog) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
    }

    struct RecordingStorage {
        log: CallLog,
        fail_init: bool,
        fail_close: bool,
    }

    #[async_trait]
    impl StorageEngine for RecordingStorage {
        fn describe(&self) -> String {
            "recording".to_string()
        }

        async fn init(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("acquire");
            if self.fail_init {
                return Err(CrawlError::storage_init("database unreachable"));
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("release");
            if self.fail_close {
                return Err(CrawlError::storage_teardown("connection reset"));
            }
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    struct RecordingBackend {
        platform: Platform,
        log: CallLog,
        behavior: Behavior,
    }

    #[async_trait]
    impl CrawlerBackend for RecordingBackend {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn run(&mut self, ctx: RunContext<'_>) -> Result<()> {
            self.log.lock().unwrap().push(if ctx.storage().is_some() {
                "run+storage"
            } else {
                "run"
            });
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(CrawlError::backend(self.platform.token(), "captcha wall")),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }

    struct Harness {
        log: CallLog,
        registry: PlatformRegistry,
    }

    impl Harness {
        fn new(behavior: Behavior) -> Self {
            let log: CallLog = Arc::default();
            let mut registry = PlatformRegistry::new();
            for platform in Platform::ALL {
                let log = Arc::clone(&log);
                registry.register(platform, move |_config| {
                    log.lock().unwrap().push("construct");
                    Box::new(RecordingBackend {
                        platform,
                        log: Arc::clone(&log),
                        behavior,
                    })
                });
            }
            Self { log, registry }
        }

        fn storage(&self) -> Box<RecordingStorage> {
            Box::new(RecordingStorage {
                log: Arc::clone(&self.log),
                fail_init: false,
                fail_close: false,
            })
        }

        fn driver(&self, platform: &str, mode: SaveDataOption) -> LifecycleDriver<'_> {
            let config = CrawlerConfig::new(platform, mode).with_keywords(["rust"]);
            LifecycleDriver::with_registry(Arc::new(config), &self.registry)
                .with_storage_engine(self.storage())
        }
    }

    #[tokio::test]
    async fn test_unmanaged_storage_skips_acquire_and_release() {
        for mode in [SaveDataOption::Json, SaveDataOption::Csv] {
            let harness = Harness::new(Behavior::Succeed);
            let mut driver = harness.driver("xhs", mode);

            let report = driver.execute(CancellationToken::new()).await.unwrap();

            assert_eq!(calls(&harness.log), vec!["construct", "run"]);
            assert_eq!(report.storage, ReleaseOutcome::NotManaged);
            assert_eq!(
                report.transitions,
                vec![
                    LifecycleState::Configuring,
                    LifecycleState::BackendResolving,
                    LifecycleState::Running,
                    LifecycleState::Done,
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_managed_storage_wraps_run() {
        for mode in [SaveDataOption::Db, SaveDataOption::Sqlite] {
            let harness = Harness::new(Behavior::Succeed);
            let config = {
                let mut c = CrawlerConfig::new("wb", mode).with_keywords(["rust"]);
                c.db_url = Some("mysql://localhost/media_crawler".into());
                c
            };
            let mut driver = LifecycleDriver::with_registry(Arc::new(config), &harness.registry)
                .with_storage_engine(harness.storage());

            let report = driver.execute(CancellationToken::new()).await.unwrap();

            assert_eq!(
                calls(&harness.log),
                vec!["acquire", "construct", "run+storage", "release"]
            );
            assert_eq!(report.storage, ReleaseOutcome::Closed);
            assert_eq!(report.platform, Platform::Weibo);
            assert_eq!(
                report.transitions,
                vec![
                    LifecycleState::Configuring,
                    LifecycleState::StorageAcquiring,
                    LifecycleState::BackendResolving,
                    LifecycleState::Running,
                    LifecycleState::StorageReleasing,
                    LifecycleState::Done,
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_platform_fails_before_any_resource() {
        let harness = Harness::new(Behavior::Succeed);
        let mut driver = harness.driver("unknown", SaveDataOption::Sqlite);

        let err = driver.execute(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CrawlError::InvalidPlatform { .. }));
        assert!(calls(&harness.log).is_empty());
        assert_eq!(
            driver.history(),
            &[LifecycleState::Configuring, LifecycleState::Failed]
        );
    }

    #[tokio::test]
    async fn test_configuration_error_fails_before_any_resource() {
        let harness = Harness::new(Behavior::Succeed);
        let config = CrawlerConfig::new("dy", SaveDataOption::Sqlite);
        let mut driver = LifecycleDriver::with_registry(Arc::new(config), &harness.registry)
            .with_storage_engine(harness.storage());

        let err = driver.execute(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CrawlError::Configuration(_)));
        assert!(calls(&harness.log).is_empty());
        assert_eq!(driver.state(), LifecycleState::Failed);
    }

    #[tokio::test]
    async fn test_storage_init_failure_never_constructs_backend() {
        let harness = Harness::new(Behavior::Succeed);
        let config = CrawlerConfig::new("bili", SaveDataOption::Sqlite).with_keywords(["rust"]);
        let storage = Box::new(RecordingStorage {
            log: Arc::clone(&harness.log),
            fail_init: true,
            fail_close: false,
        });
        let mut driver =
            LifecycleDriver::with_registry(Arc::new(config), &harness.registry).with_storage_engine(storage);

        let err = driver.execute(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CrawlError::StorageInit(_)));
        assert_eq!(calls(&harness.log), vec!["acquire"]);
        assert_eq!(
            driver.history(),
            &[
                LifecycleState::Configuring,
                LifecycleState::StorageAcquiring,
                LifecycleState::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_still_releases_storage() {
        let harness = Harness::new(Behavior::Fail);
        let mut driver = harness.driver("tieba", SaveDataOption::Sqlite);

        let err = driver.execute(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CrawlError::BackendRuntime { ref platform, .. } if platform == "tieba"));
        assert_eq!(
            calls(&harness.log),
            vec!["acquire", "construct", "run+storage", "release"]
        );
        assert_eq!(
            driver.history(),
            &[
                LifecycleState::Configuring,
                LifecycleState::StorageAcquiring,
                LifecycleState::BackendResolving,
                LifecycleState::Running,
                LifecycleState::StorageReleasing,
                LifecycleState::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn test_teardown_failure_does_not_override_success() {
        let harness = Harness::new(Behavior::Succeed);
        let config = CrawlerConfig::new("ks", SaveDataOption::Sqlite).with_keywords(["rust"]);
        let storage = Box::new(RecordingStorage {
            log: Arc::clone(&harness.log),
            fail_init: false,
            fail_close: true,
        });
        let mut driver =
            LifecycleDriver::with_registry(Arc::new(config), &harness.registry).with_storage_engine(storage);

        let report = driver.execute(CancellationToken::new()).await.unwrap();

        assert!(matches!(report.storage, ReleaseOutcome::TeardownFailed(ref m) if m.contains("connection reset")));
        assert_eq!(driver.state(), LifecycleState::Done);
    }

    #[tokio::test]
    async fn test_interrupt_during_run_releases_storage() {
        let harness = Harness::new(Behavior::Hang);
        let mut driver = harness.driver("zhihu", SaveDataOption::Sqlite);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });

        let err = driver.execute(token).await.unwrap_err();

        assert!(err.is_interrupt());
        assert_eq!(
            calls(&harness.log),
            vec!["acquire", "construct", "run+storage", "release"]
        );
        assert_eq!(
            driver.history(),
            &[
                LifecycleState::Configuring,
                LifecycleState::StorageAcquiring,
                LifecycleState::BackendResolving,
                LifecycleState::Running,
                LifecycleState::StorageReleasing,
                LifecycleState::Interrupted,
            ]
        );
    }

    #[tokio::test]
    async fn test_interrupt_before_start_touches_nothing() {
        let harness = Harness::new(Behavior::Succeed);
        let mut driver = harness.driver("xhs", SaveDataOption::Sqlite);

        let token = CancellationToken::new();
        token.cancel();
        let err = driver.execute(token).await.unwrap_err();

        assert!(err.is_interrupt());
        assert!(calls(&harness.log).is_empty());
        assert_eq!(driver.state(), LifecycleState::Interrupted);
    }

    #[tokio::test]
    async fn test_driver_executes_only_once() {
        let harness = Harness::new(Behavior::Succeed);
        let mut driver = harness.driver("dy", SaveDataOption::Json);

        driver.execute(CancellationToken::new()).await.unwrap();
        let err = driver.execute(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CrawlError::Configuration(_)));
        assert_eq!(calls(&harness.log), vec!["construct", "run"]);
    }

    #[tokio::test]
    async fn test_builtin_backend_with_real_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CrawlerConfig::new("bili", SaveDataOption::Sqlite).with_keywords(["rust"]);
        config.sqlite_path = dir.path().join("db").join("crawlhub.db");
        config.max_notes_count = 40;

        let mut driver = LifecycleDriver::new(Arc::new(config.clone()));
        let report = driver.execute(CancellationToken::new()).await.unwrap();

        assert_eq!(report.platform, Platform::Bilibili);
        assert_eq!(report.storage, ReleaseOutcome::Closed);
        assert!(config.sqlite_path.exists());
        assert!(report.finished_at >= report.started_at);
    }

    struct StalledStorage {
        log: CallLog,
    }

    #[async_trait]
    impl StorageEngine for StalledStorage {
        fn describe(&self) -> String {
            "stalled".to_string()
        }

        async fn init(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("acquire");
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("release");
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_interrupt_during_acquire_never_constructs_backend() {
        let harness = Harness::new(Behavior::Succeed);
        let config = CrawlerConfig::new("wb", SaveDataOption::Sqlite).with_keywords(["rust"]);
        let storage = Box::new(StalledStorage {
            log: Arc::clone(&harness.log),
        });
        let mut driver =
            LifecycleDriver::with_registry(Arc::new(config), &harness.registry).with_storage_engine(storage);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });

        let err = driver.execute(token).await.unwrap_err();

        assert!(err.is_interrupt());
        // init started but never finished, so nothing is held and close is skipped
        assert_eq!(calls(&harness.log), vec!["acquire"]);
        assert_eq!(
            driver.history(),
            &[
                LifecycleState::Configuring,
                LifecycleState::StorageAcquiring,
                LifecycleState::Interrupted
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_start_page_fails_before_storage() {
        let harness = Harness::new(Behavior::Succeed);
        let mut config = CrawlerConfig::new("xhs", SaveDataOption::Sqlite).with_keywords(["rust"]);
        config.start_page = u32::MAX;
        let mut driver = LifecycleDriver::with_registry(Arc::new(config), &harness.registry)
            .with_storage_engine(harness.storage());

        let err = driver.execute(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, CrawlError::Configuration(ref m) if m.contains("start page")));
        assert!(calls(&harness.log).is_empty());
    }
}

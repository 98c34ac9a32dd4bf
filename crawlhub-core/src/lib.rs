/*!
# Crawlhub Core

Orchestration core for multi-platform content acquisition.

This crate selects a platform backend, optionally brings up a database for the
run, drives the backend to completion, and tears the database back down:

- [`PlatformRegistry`]: fixed token → backend constructor mapping
- [`CrawlerBackend`]: the single-operation capability each platform implements
- [`StorageResourceManager`]: acquire-once, release-at-most-once storage handle
- [`LifecycleDriver`]: sequences configuration, storage, run and teardown under
  a cancellation token

## Usage

```rust,no_run
use crawlhub_core::{CrawlerConfig, LifecycleDriver, SaveDataOption};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

# async fn run() -> crawlhub_core::Result<()> {
let config = CrawlerConfig::new("xhs", SaveDataOption::Json).with_keywords(["rust"]);
let mut driver = LifecycleDriver::new(Arc::new(config));

let report = driver.execute(CancellationToken::new()).await?;
println!("run {} finished on {}", report.run_id, report.platform);
# Ok(())
# }
```
*/

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod observability;
pub mod platform;
pub mod platforms;
pub mod registry;
pub mod storage;

#[cfg(test)]
mod driver_tests;

pub use backend::{CrawlerBackend, RunContext};
pub use config::{CrawlerConfig, CrawlerType, LoginType, SaveDataOption};
pub use driver::{LifecycleDriver, LifecycleState, RunReport};
pub use error::{CrawlError, Result, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_SUCCESS};
pub use observability::{init_observability, LogOptions};
pub use platform::Platform;
pub use registry::{BackendConstructor, PlatformRegistry, RegistryEntry};
pub use storage::{ReleaseOutcome, SqlStorage, StorageEngine, StorageResourceManager, StorageState};

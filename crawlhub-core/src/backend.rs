/*!
The capability every platform backend provides.

A backend performs one complete acquisition run for its platform. It may
suspend on I/O anywhere inside `run`, and any unrecoverable failure must be
returned rather than swallowed.
*/

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::platform::Platform;
use crate::storage::StorageEngine;
use crate::{CrawlError, Result};

/// What a backend can see of the orchestrator while it runs
pub struct RunContext<'a> {
    storage: Option<&'a dyn StorageEngine>,
    cancel: CancellationToken,
}

impl<'a> RunContext<'a> {
    pub fn new(storage: Option<&'a dyn StorageEngine>, cancel: CancellationToken) -> Self {
        Self { storage, cancel }
    }

    /// Open storage handle, present only in `db`/`sqlite` modes
    pub fn storage(&self) -> Option<&'a dyn StorageEngine> {
        self.storage
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Return `Interrupted` if the run has been cancelled
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(CrawlError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// A platform-specific acquisition backend
#[async_trait]
pub trait CrawlerBackend: Send {
    /// Platform this backend serves
    fn platform(&self) -> Platform;

    /// Run the full acquisition workflow to completion
    async fn run(&mut self, ctx: RunContext<'_>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_follows_token() {
        let token = CancellationToken::new();
        let ctx = RunContext::new(None, token.clone());
        assert!(ctx.checkpoint().is_ok());
        assert!(ctx.storage().is_none());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.checkpoint(), Err(CrawlError::Interrupted)));
    }
}

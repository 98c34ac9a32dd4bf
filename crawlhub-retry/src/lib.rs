//! Retry and backoff helpers for crawlhub
//!
//! Storage connections are the only place the orchestrator retries anything:
//! a database that is still starting up should not fail the whole run on the
//! first refused connection.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use futures::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Errors produced by a retried operation
#[derive(Error, Debug)]
pub enum RetryError {
    #[error("Operation '{operation}' gave up after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        operation: &'static str,
        attempts: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Transient error in '{operation}': {source}")]
    Transient {
        operation: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Permanent error in '{operation}': {source}")]
    Permanent {
        operation: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RetryError {
    /// Name of the operation that produced this error
    pub fn operation(&self) -> &'static str {
        match self {
            RetryError::MaxRetriesExceeded { operation, .. }
            | RetryError::Transient { operation, .. }
            | RetryError::Permanent { operation, .. } => operation,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T> = std::result::Result<T, RetryError>;

/// Boxed future for retry operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = RetryResult<T>> + Send + 'a>>;

/// Attempt budget plus the backoff schedule between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: ExponentialBackoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy for establishing database connections
    pub fn storage_connect() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, storage_connect_backoff_policy())
    }

    /// Millisecond-scale policy without jitter, used by tests and local files
    pub fn immediate(max_attempts: usize) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(1))
            .with_randomization_factor(0.0)
            .with_max_interval(Duration::from_millis(5))
            .with_max_elapsed_time(None)
            .build();
        Self::new(max_attempts, backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, default_backoff_policy())
    }
}

/// Execute an operation with the default retry policy
pub async fn with_backoff<F, T>(op_name: &'static str, f: F) -> RetryResult<T>
where
    F: FnMut(usize) -> BoxFuture<'static, T>,
{
    with_policy(op_name, RetryPolicy::default(), f).await
}

/// Execute an operation, retrying transient failures according to `policy`.
///
/// Permanent errors are returned as-is on the attempt they occur.
pub async fn with_policy<F, T>(op_name: &'static str, policy: RetryPolicy, mut f: F) -> RetryResult<T>
where
    F: FnMut(usize) -> BoxFuture<'static, T>,
{
    let RetryPolicy {
        max_attempts,
        mut backoff,
    } = policy;
    backoff.reset();

    let mut attempt = 1;
    loop {
        debug!(operation = op_name, attempt, "attempting operation");

        match f(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(operation = op_name, attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err @ RetryError::Permanent { .. }) => {
                warn!(operation = op_name, attempt, "operation failed permanently");
                return Err(err);
            }
            Err(err) => {
                warn!(operation = op_name, attempt, error = %err, "operation failed");

                let delay = if attempt >= max_attempts {
                    None
                } else {
                    backoff.next_backoff()
                };

                let Some(delay) = delay else {
                    let source = match err {
                        RetryError::Transient { source, .. }
                        | RetryError::Permanent { source, .. }
                        | RetryError::MaxRetriesExceeded { source, .. } => source,
                    };
                    return Err(RetryError::MaxRetriesExceeded {
                        operation: op_name,
                        attempts: attempt,
                        source,
                    });
                };

                attempt += 1;

                #[cfg(feature = "async-rt")]
                tokio::time::sleep(delay).await;

                #[cfg(not(feature = "async-rt"))]
                std::thread::sleep(delay);
            }
        }
    }
}

/// Default backoff policy for general operations
pub fn default_backoff_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(100))
        .with_max_interval(Duration::from_secs(5))
        .with_max_elapsed_time(Some(Duration::from_secs(30)))
        .with_multiplier(2.0)
        .build()
}

/// Backoff policy for database connection attempts
pub fn storage_connect_backoff_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(4))
        .with_max_elapsed_time(Some(Duration::from_secs(20)))
        .with_multiplier(2.0)
        .build()
}

/// Helper macro for creating transient errors
#[macro_export]
macro_rules! transient_error {
    ($op:expr, $err:expr) => {
        $crate::RetryError::Transient {
            operation: $op,
            source: Box::new($err),
        }
    };
}

/// Helper macro for creating permanent errors
#[macro_export]
macro_rules! permanent_error {
    ($op:expr, $err:expr) => {
        $crate::RetryError::Permanent {
            operation: $op,
            source: Box::new($err),
        }
    };
}

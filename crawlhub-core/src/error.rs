/*!
Error types for the crawlhub core.
*/

use thiserror::Error;

/// Result type used throughout the crawlhub core.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Process exit status for a clean run
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit status for any fatal error
pub const EXIT_FAILURE: u8 = 1;

/// Process exit status after a user interrupt (128 + SIGINT)
pub const EXIT_INTERRUPTED: u8 = 130;

/// Errors that can occur while orchestrating a crawl run.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Invalid or missing settings, raised before any resource is touched
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Platform token not present in the registry
    #[error("Invalid media platform '{token}': supported platforms are {valid}")]
    InvalidPlatform { token: String, valid: String },

    /// Storage resource unreachable or invalid
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    /// Storage release failed; logged, never overrides the run outcome
    #[error("Storage teardown failed: {0}")]
    StorageTeardown(String),

    /// Failure surfaced from a platform backend's run
    #[error("Backend '{platform}' failed: {message}")]
    BackendRuntime { platform: String, message: String },

    /// External interrupt cancelled the run
    #[error("Run interrupted")]
    Interrupted,

    /// I/O errors while loading configuration or preparing storage paths
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors while loading configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new storage initialization error
    pub fn storage_init<S: Into<String>>(msg: S) -> Self {
        Self::StorageInit(msg.into())
    }

    /// Create a new storage teardown error
    pub fn storage_teardown<S: Into<String>>(msg: S) -> Self {
        Self::StorageTeardown(msg.into())
    }

    /// Create a new backend runtime error
    pub fn backend<P: Into<String>, S: Into<String>>(platform: P, msg: S) -> Self {
        Self::BackendRuntime {
            platform: platform.into(),
            message: msg.into(),
        }
    }

    /// Stable label naming the failure kind, used in diagnostics and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::Configuration(_) | CrawlError::Io(_) | CrawlError::Json(_) => {
                "configuration"
            }
            CrawlError::InvalidPlatform { .. } => "invalid_platform",
            CrawlError::StorageInit(_) => "storage_init",
            CrawlError::StorageTeardown(_) => "storage_teardown",
            CrawlError::BackendRuntime { .. } => "backend_runtime",
            CrawlError::Interrupted => "interrupted",
        }
    }

    /// Whether this error came from an external interrupt
    pub fn is_interrupt(&self) -> bool {
        matches!(self, CrawlError::Interrupted)
    }

    /// Process exit status this error maps to
    pub fn exit_code(&self) -> u8 {
        if self.is_interrupt() {
            EXIT_INTERRUPTED
        } else {
            EXIT_FAILURE
        }
    }
}

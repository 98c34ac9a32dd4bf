/*!
Observability for crawlhub runs.

- Structured logging through `tracing`, console or JSON output
- Optional Prometheus metrics (`metrics` feature)
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, IntCounterVec, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{CrawlError, Result};

/// Logging options chosen on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// 0 = info, 1 = debug, 2+ = trace
    pub verbosity: u8,
    /// Emit one JSON object per event instead of human readable lines
    pub json: bool,
}

impl LogOptions {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> &'static str {
        match self.verbosity {
            0 => "info,sqlx=warn",
            1 => "debug,sqlx=info",
            _ => "trace",
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the verbosity.
pub fn init_observability(options: LogOptions) -> Result<()> {
    #[cfg(feature = "metrics")]
    CrawlMetrics::global();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));

    let installed = if options.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };

    installed.map_err(|e| {
        CrawlError::configuration(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("crawlhub observability initialized");
    Ok(())
}

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<CrawlMetrics> = OnceLock::new();

/// Run-level metrics
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct CrawlMetrics {
    pub runs_total: Counter,
    /// Failed runs, labelled by error kind
    pub run_failures_total: IntCounterVec,
    pub storage_acquire_seconds: Histogram,
    pub run_duration_seconds: Histogram,
    registry: Registry,
}

#[cfg(feature = "metrics")]
impl CrawlMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();
        let metric_err =
            |e: prometheus::Error| CrawlError::configuration(format!("Failed to create metric: {e}"));

        let runs_total = Counter::new("crawlhub_runs_total", "Total crawl runs started")
            .map_err(metric_err)?;
        let run_failures_total = IntCounterVec::new(
            prometheus::Opts::new("crawlhub_run_failures_total", "Crawl runs that did not succeed"),
            &["kind"],
        )
        .map_err(metric_err)?;
        let storage_acquire_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "crawlhub_storage_acquire_seconds",
            "Time spent opening managed storage",
        ))
        .map_err(metric_err)?;
        let run_duration_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "crawlhub_run_duration_seconds",
            "Duration of backend runs in seconds",
        ))
        .map_err(metric_err)?;

        registry
            .register(Box::new(runs_total.clone()))
            .map_err(metric_err)?;
        registry
            .register(Box::new(run_failures_total.clone()))
            .map_err(metric_err)?;
        registry
            .register(Box::new(storage_acquire_seconds.clone()))
            .map_err(metric_err)?;
        registry
            .register(Box::new(run_duration_seconds.clone()))
            .map_err(metric_err)?;

        Ok(Self {
            runs_total,
            run_failures_total,
            storage_acquire_seconds,
            run_duration_seconds,
            registry,
        })
    }

    /// Get or initialize the global metrics instance
    pub fn global() -> &'static CrawlMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize crawlhub metrics"))
    }

    pub fn record_run_started(&self) {
        self.runs_total.inc();
    }

    pub fn record_run_failure(&self, kind: &str) {
        self.run_failures_total.with_label_values(&[kind]).inc();
    }

    pub fn record_storage_acquire(&self, duration: std::time::Duration) {
        self.storage_acquire_seconds.observe(duration.as_secs_f64());
    }

    pub fn record_run_duration(&self, duration: std::time::Duration) {
        self.run_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| CrawlError::configuration(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer).map_err(|e| {
            CrawlError::configuration(format!("Failed to convert metrics to string: {e}"))
        })
    }
}

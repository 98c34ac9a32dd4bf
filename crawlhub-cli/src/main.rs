/*!
Crawlhub CLI - command-line entry point for multi-platform content crawling.

`crawlhub run` executes one crawl lifecycle for a platform; `crawlhub platforms`
lists the supported platform tokens.
*/

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use crawlhub_core::platforms::profile;
use crawlhub_core::{
    init_observability, CrawlError, CrawlerConfig, CrawlerType, LifecycleDriver, LogOptions,
    LoginType, PlatformRegistry, ReleaseOutcome, RunReport, SaveDataOption, EXIT_FAILURE,
    EXIT_INTERRUPTED, EXIT_SUCCESS,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "crawlhub")]
#[command(about = "Multi-platform content crawler")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print Prometheus metrics to stderr when the command finishes
    #[cfg(feature = "metrics")]
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one crawl for a platform
    Run(RunArgs),
    /// List supported platforms
    Platforms,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON configuration file; flags override its values
    #[arg(short, long, env = "CRAWLHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Platform token (xhs | dy | ks | bili | wb | tieba | zhihu)
    #[arg(long)]
    platform: Option<String>,

    /// Login type
    #[arg(long = "lt", value_enum)]
    login_type: Option<LoginArg>,

    /// Crawler type
    #[arg(long = "type", value_enum)]
    crawler_type: Option<CrawlerArg>,

    /// First result page
    #[arg(long = "start")]
    start_page: Option<u32>,

    /// Comma separated search keywords
    #[arg(long)]
    keywords: Option<String>,

    /// Collect first level comments (yes/no)
    #[arg(long = "get_comment", value_parser = BoolishValueParser::new())]
    get_comment: Option<bool>,

    /// Collect second level comments (yes/no)
    #[arg(long = "get_sub_comment", value_parser = BoolishValueParser::new())]
    get_sub_comment: Option<bool>,

    /// Where to save collected data
    #[arg(long = "save_data_option", value_enum)]
    save_data_option: Option<SaveArg>,

    /// Cookie string used with cookie login
    #[arg(long)]
    cookies: Option<String>,

    /// Database URL for db storage
    #[arg(long, env = "CRAWLHUB_DB_URL")]
    db_url: Option<String>,

    /// SQLite database file for sqlite storage
    #[arg(long)]
    sqlite_path: Option<PathBuf>,

    /// Validate and print the effective configuration without running
    #[arg(long)]
    dry_run: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LoginArg {
    Qrcode,
    Phone,
    Cookie,
}

impl From<LoginArg> for LoginType {
    fn from(arg: LoginArg) -> Self {
        match arg {
            LoginArg::Qrcode => LoginType::Qrcode,
            LoginArg::Phone => LoginType::Phone,
            LoginArg::Cookie => LoginType::Cookie,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CrawlerArg {
    Search,
    Detail,
    Creator,
}

impl From<CrawlerArg> for CrawlerType {
    fn from(arg: CrawlerArg) -> Self {
        match arg {
            CrawlerArg::Search => CrawlerType::Search,
            CrawlerArg::Detail => CrawlerType::Detail,
            CrawlerArg::Creator => CrawlerType::Creator,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SaveArg {
    Db,
    Sqlite,
    Csv,
    Json,
}

impl From<SaveArg> for SaveDataOption {
    fn from(arg: SaveArg) -> Self {
        match arg {
            SaveArg::Db => SaveDataOption::Db,
            SaveArg::Sqlite => SaveDataOption::Sqlite,
            SaveArg::Csv => SaveDataOption::Csv,
            SaveArg::Json => SaveDataOption::Json,
        }
    }
}

#[derive(Tabled)]
struct PlatformRow {
    #[tabled(rename = "Token")]
    token: &'static str,
    #[tabled(rename = "Platform")]
    name: &'static str,
    #[tabled(rename = "Index URL")]
    index_url: &'static str,
    #[tabled(rename = "Page Size")]
    page_size: u32,
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Run ID")]
    run_id: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Save")]
    save: String,
    #[tabled(rename = "Storage")]
    storage: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_observability(LogOptions {
        verbosity: cli.verbose,
        json: cli.log_json,
    }) {
        eprintln!("warning: {e}");
    }

    let status = match cli.command {
        Commands::Run(args) => match run_crawler(args).await {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => report_failure(&e),
        },
        Commands::Platforms => {
            list_platforms();
            EXIT_SUCCESS
        }
    };

    #[cfg(feature = "metrics")]
    print_metrics(cli.metrics);

    ExitCode::from(status)
}

#[cfg(feature = "metrics")]
fn print_metrics(enabled: bool) {
    if !enabled {
        return;
    }
    match crawlhub_core::observability::CrawlMetrics::global().gather_metrics() {
        Ok(text) => eprint!("{text}"),
        Err(e) => warn!("Failed to gather metrics: {}", e),
    }
}

/// Log the failure and pick the process exit status
fn report_failure(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CrawlError>() {
        Some(CrawlError::Interrupted) => {
            warn!("Interrupted, exiting");
            CrawlError::Interrupted.exit_code()
        }
        Some(crawl_err) => {
            error!(kind = crawl_err.kind(), "{:#}", err);
            eprintln!("error[{}]: {:#}", crawl_err.kind(), err);
            crawl_err.exit_code()
        }
        None => {
            error!("{:#}", err);
            eprintln!("error: {err:#}");
            EXIT_FAILURE
        }
    }
}

async fn run_crawler(args: RunArgs) -> Result<(), anyhow::Error> {
    let dry_run = args.dry_run;
    let config = build_config(args)?;

    if dry_run {
        config.validate()?;
        PlatformRegistry::builtin().lookup(&config.platform)?;
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    let mut driver = LifecycleDriver::new(Arc::new(config));
    info!(run_id = %driver.run_id(), "Starting crawl");
    let report = driver.execute(cancel).await?;

    print_report(&report);
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    /// Cancel the run and let storage release finish
    Shutdown,
    /// Stop waiting for teardown and exit now
    ForceExit,
}

/// First interrupt cancels the run; any later one forces the exit
fn on_interrupt(received: usize, cancel: &CancellationToken) -> InterruptAction {
    if received <= 1 {
        cancel.cancel();
        InterruptAction::Shutdown
    } else {
        InterruptAction::ForceExit
    }
}

async fn watch_interrupts(cancel: CancellationToken) {
    let mut received = 0;
    while tokio::signal::ctrl_c().await.is_ok() {
        received += 1;
        match on_interrupt(received, &cancel) {
            InterruptAction::Shutdown => {
                warn!("Received interrupt, shutting down (press Ctrl+C again to force)");
            }
            InterruptAction::ForceExit => {
                warn!("Received second interrupt, exiting without waiting for teardown");
                std::process::exit(i32::from(EXIT_INTERRUPTED));
            }
        }
    }
}

/// Merge the optional config file with command-line overrides
fn build_config(args: RunArgs) -> Result<CrawlerConfig, anyhow::Error> {
    let mut config = match &args.config {
        Some(path) => CrawlerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CrawlerConfig::default(),
    };

    if let Some(platform) = args.platform {
        config.platform = platform;
    }
    if let Some(login_type) = args.login_type {
        config.login_type = login_type.into();
    }
    if let Some(crawler_type) = args.crawler_type {
        config.crawler_type = crawler_type.into();
    }
    if let Some(start_page) = args.start_page {
        config.start_page = start_page;
    }
    if let Some(keywords) = args.keywords {
        config.keywords = CrawlerConfig::parse_keywords(&keywords);
    }
    if let Some(enabled) = args.get_comment {
        config.enable_comments = enabled;
    }
    if let Some(enabled) = args.get_sub_comment {
        config.enable_sub_comments = enabled;
    }
    if let Some(save) = args.save_data_option {
        config.save_data_option = save.into();
    }
    if args.cookies.is_some() {
        config.cookies = args.cookies;
    }
    if args.db_url.is_some() {
        config.db_url = args.db_url;
    }
    if let Some(path) = args.sqlite_path {
        config.sqlite_path = path;
    }

    Ok(config)
}

fn list_platforms() {
    let rows: Vec<PlatformRow> = PlatformRegistry::builtin()
        .platforms()
        .iter()
        .map(|platform| {
            let profile = profile(*platform);
            PlatformRow {
                token: platform.token(),
                name: platform.display_name(),
                index_url: profile.index_url,
                page_size: profile.search_page_size,
            }
        })
        .collect();

    println!("{}", Table::new(rows));
}

fn print_report(report: &RunReport) {
    let storage = match &report.storage {
        ReleaseOutcome::NotManaged => "-".to_string(),
        ReleaseOutcome::NotHeld => "not held".to_string(),
        ReleaseOutcome::Closed => "closed".to_string(),
        ReleaseOutcome::TeardownFailed(reason) => format!("teardown failed: {reason}"),
    };
    let elapsed = report.finished_at - report.started_at;

    let row = RunRow {
        run_id: report.run_id.to_string(),
        platform: report.platform.to_string(),
        save: report.save_data_option.to_string(),
        storage,
        duration: format!("{:.2}s", elapsed.num_milliseconds() as f64 / 1000.0),
    };
    println!("{}", Table::new([row]));
}

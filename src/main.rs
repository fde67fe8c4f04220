//! Play-Sweeper main entry point
//!
//! This is the command-line interface for the Play-Sweeper catalog crawler.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use play_sweeper::config::{load_config_with_hash, Config};
use play_sweeper::control::Controller;
use play_sweeper::fetch::{app_details_url, seed_pairs};
use play_sweeper::server::run_server;
use play_sweeper::state::ProcessKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Play-Sweeper: a breadth-first app-store catalog crawler
///
/// By default Play-Sweeper serves the control API and runs crawl jobs on
/// request. With `--run` it runs a single job in the foreground instead.
#[derive(Parser, Debug)]
#[command(name = "play-sweeper")]
#[command(version = "1.0.0")]
#[command(about = "A breadth-first app-store catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run one job (DISCOVER or DETAILS) in the foreground and exit
    #[arg(long, value_name = "TYPE", value_parser = parse_kind, conflicts_with = "dry_run")]
    run: Option<ProcessKind>,

    /// Directory holding previous dumps for a DETAILS job
    #[arg(long, value_name = "DIR", requires = "run")]
    read_dir: Option<PathBuf>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

fn parse_kind(value: &str) -> Result<ProcessKind, String> {
    ProcessKind::from_param(value).ok_or_else(|| format!("expected DISCOVER or DETAILS, got {}", value))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if cli.dry_run {
        setup_logging(cli.verbose, cli.quiet, None)?;
        handle_dry_run(&config);
        return Ok(());
    }

    let (_guard, logfile) = setup_logging(cli.verbose, cli.quiet, Some(Path::new(&config.output.log_dir)))?;
    tracing::info!("Configuration loaded from {} (hash: {})", cli.config.display(), config_hash);

    let controller = Controller::from_config(
        config.clone(),
        logfile.map(|path| path.display().to_string()),
    )
    .context("Failed to set up job control")?;

    match cli.run {
        Some(kind) => handle_foreground(&controller, kind, cli.read_dir).await?,
        None => handle_serve(&config, &controller).await?,
    }

    controller.join_workers();
    Ok(())
}

/// Sets up console logging, plus a log file when `log_dir` is given
///
/// Returns the file writer's guard, which must be held until exit, and the
/// log file path.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<(Option<WorkerGuard>, Option<PathBuf>)> {
    let filter = || {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("play_sweeper=info,warn"),
                1 => EnvFilter::new("play_sweeper=debug,info"),
                2 => EnvFilter::new("play_sweeper=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    };
    let console = fmt::layer().with_target(false);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry().with(filter()).with(console).init();
        return Ok((None, None));
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_name = format!("play-sweeper_{}.log", Utc::now().timestamp());
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));
    let file = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);

    tracing_subscriber::registry()
        .with(filter())
        .with(console)
        .with(file)
        .init();

    Ok((Some(guard), Some(log_dir.join(file_name))))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Play-Sweeper Dry Run ===\n");

    println!("Control API: {}:{}", config.server.host, config.server.port);
    println!(
        "Worker pool: {} threads ({}-N)",
        config.pool.workers, config.pool.thread_prefix
    );

    println!("\nCrawler:");
    println!("  Retry limit: {}", config.crawler.retry_limit);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Details batch size: {}", config.crawler.details_batch_size);
    println!("  Read retry limit: {}", config.crawler.read_retry_limit);

    println!("\nFetch:");
    println!("  Store: {}", config.fetch.base_url);
    println!("  Locale: hl={} gl={}", config.fetch.language, config.fetch.country);
    if let Some(url) = app_details_url(&config.fetch, "<app_id>") {
        println!("  Detail pages: {}", url);
    }
    println!(
        "  Timeouts: {}s total, {}s connect",
        config.fetch.timeout_secs, config.fetch.connect_timeout_secs
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.output_dir);
    println!("  Logs: {}", config.output.log_dir);
    println!(
        "  Files: {}_<id>[_detailed].json.<n>, {} records each",
        config.output.file_prefix, config.output.max_records_per_file
    );

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Discovery would seed {} collection/category pairs",
        seed_pairs().count()
    );
}

/// Runs one job and prints its final snapshot; Ctrl-C stops it early
async fn handle_foreground(
    controller: &Controller,
    kind: ProcessKind,
    read_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let started = controller.start(kind, read_dir)?;
    let process_id = started.process_id;
    tracing::info!("Running {} process {} in the foreground", kind, process_id);

    let registry = Arc::clone(controller.registry());
    let snapshot = tokio::select! {
        snapshot = registry.wait_closed(&process_id) => snapshot,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping process {}", process_id);
            Some(controller.stop(&process_id, false).await?)
        }
    };

    match snapshot {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot.with_records(false))?),
        None => tracing::warn!("Process {} disappeared from the registry", process_id),
    }
    Ok(())
}

/// Serves the control API; on exit stops every running job
async fn handle_serve(config: &Config, controller: &Controller) -> anyhow::Result<()> {
    run_server(&config.server, controller.clone())
        .await
        .context("Control API failed")?;

    let closed = controller.shutdown_all().await;
    tracing::info!("Stopped {} processes, exiting", closed.len());
    Ok(())
}

//! Sumi-Sift main entry point
//!
//! This is the command-line interface for the Sumi-Sift listing extractor.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sumi_sift::config::{load_config_with_hash, Config};
use sumi_sift::crawler::{generate, Crawler};
use sumi_sift::output::{
    print_statistics, print_troubleshooting, CsvSink, RecordSink, RunStatistics, WriteMode,
};
use sumi_sift::SiftError;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Sumi-Sift: a polite listing extractor
///
/// Sumi-Sift walks a range of listing pages, finds the repeated item
/// containers on each one, extracts a record per container according to the
/// configured field map, and writes the records as CSV.
#[derive(Parser, Debug)]
#[command(name = "sumi-sift")]
#[command(version = "1.0.0")]
#[command(about = "A polite listing extractor", long_about = None)]
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

    /// Validate config and show the pages that would be fetched without fetching them
    #[arg(long)]
    dry_run: bool,

    /// Write the CSV here instead of the configured path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Append to the CSV instead of overwriting it
    #[arg(long)]
    append: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let csv_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.csv_path));
    let mode = if cli.append {
        WriteMode::Append
    } else {
        config.output.mode
    };

    handle_crawl(config, CsvSink::new(csv_path, mode)).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sift=info,warn"),
            1 => EnvFilter::new("sumi_sift=debug,info"),
            2 => EnvFilter::new("sumi_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Sift Dry Run ===\n");

    println!("Target:");
    println!("  Base URL: {}", config.target.base_url);
    println!("  Pagination: {}", config.target.pagination_template);
    println!(
        "  Pages: {}..={}",
        config.target.first_page, config.target.last_page
    );
    println!("  Container: {}", config.target.container_selector);

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Attempts per page: {}", config.fetcher.max_retries);
    println!("  Backoff base: {}ms", config.fetcher.backoff_base_ms);
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nCrawler:");
    println!("  Polite delay: {}ms", config.crawler.polite_delay_ms);
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages
    );

    println!("\nFields ({}):", config.fields.len());
    for field in &config.fields {
        match &field.attribute {
            Some(attribute) => println!(
                "  - {}: {} ({:?}, {})",
                field.name, field.selector, field.mode, attribute
            ),
            None => println!("  - {}: {} ({:?})", field.name, field.selector, field.mode),
        }
    }

    let pages = generate(
        &config.target.pagination_template,
        config.target.first_page,
        config.target.last_page,
    );
    println!("\nPages ({}):", pages.len());
    for page in pages {
        println!("  {}: {}", page.page, page.url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would write {} ({:?})",
        config.output.csv_path, config.output.mode
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, mut sink: CsvSink) -> anyhow::Result<()> {
    tracing::info!(
        "Target: {} | Container: {} | Fields: {}",
        config.target.base_url,
        config.target.container_selector,
        config.field_names().join(", ")
    );

    let field_names = config.field_names();
    let crawler = Crawler::new(config)?;

    // Ctrl-C stops new fetches; whatever was collected is still written
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            let _ = shutdown_tx.send(true);
        }
    });

    let result = crawler.run_until(shutdown_rx).await;
    let stats = RunStatistics::from_result(&result, &field_names);

    let result = match result.require_records() {
        Ok(result) => result,
        Err(e) => {
            print_troubleshooting();
            return Err(e.into());
        }
    };

    let written = sink
        .write_records(&field_names, &result.records)
        .map_err(SiftError::from)
        .with_context(|| format!("Failed to write {}", sink.path().display()))?;

    print_statistics(&stats);
    println!(
        "✓ Successfully scraped {} items, saved to: {}",
        written,
        sink.path().display()
    );

    if result.interrupted {
        tracing::warn!("Run was interrupted; output contains partial results");
    }

    Ok(())
}

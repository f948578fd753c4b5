//! Seedcrawl main entry point
//!
//! A thin host around the engine: reads items from a TOML file, runs each one
//! through its own crawl session and prints one JSON line per output record.

use anyhow::Context;
use clap::Parser;
use seedcrawl::batch::run_batch;
use seedcrawl::config::{load_config_with_hash, Config};
use seedcrawl::crawler::{FetchBackend, HttpFetcher, SessionSettings};
use seedcrawl::FetchError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Seedcrawl: bounded link, text and HTML extraction
///
/// Every `[[item]]` in the configuration is crawled with its own session.
/// Results are written to stdout as JSON lines; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "seedcrawl")]
#[command(version)]
#[command(about = "Bounded link, text and HTML extraction", long_about = None)]
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

    /// Validate config and show what would be crawled without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_batch(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seedcrawl=info,warn"),
            1 => EnvFilter::new("seedcrawl=debug,info"),
            2 => EnvFilter::new("seedcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates every item without touching the network
fn handle_dry_run(config: &Config) {
    println!("=== Seedcrawl Dry Run ===\n");

    println!("Engine:");
    println!("  Request timeout: {}s", config.engine.request_timeout_secs);
    println!("  Max retries: {}", config.engine.max_request_retries);
    println!("  Retry delay: {}ms", config.engine.retry_delay_ms);
    println!("  Continue on failure: {}", config.engine.continue_on_failure);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nItems ({}):", config.items.len());
    for (index, item) in config.items.iter().enumerate() {
        match item.to_request() {
            Ok(request) => println!(
                "  [{}] {} {} (depth {})",
                index,
                request.operation(),
                request.seed_url(),
                request.max_depth()
            ),
            Err(e) => println!("  [{}] invalid: {}", index, e),
        }
    }

    println!("\n=== Configuration is valid ===");
}

/// Runs every configured item and prints the output records
async fn handle_batch(config: Config) -> anyhow::Result<()> {
    let settings = SessionSettings::from(&config.engine);
    let user_agent = config.user_agent.clone();
    let timeout = settings.request_timeout;

    let factory = move || -> Result<Arc<dyn FetchBackend>, FetchError> {
        let fetcher = HttpFetcher::new(&user_agent, timeout)?;
        Ok(Arc::new(fetcher) as Arc<dyn FetchBackend>)
    };

    let records = run_batch(
        &config.items,
        config.engine.continue_on_failure,
        &factory,
        &settings,
    )
    .await?;

    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }

    let failed = records.iter().filter(|r| !r.is_success()).count();
    tracing::info!("Processed {} item(s), {} failed", records.len(), failed);

    Ok(())
}

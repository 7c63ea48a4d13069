//! crs-crawler main entry point
//!
//! This is the command-line interface for the CRS identifier crawler.

use anyhow::Context;
use clap::Parser;
use crs_crawler::config::{load_config, Config};
use crs_crawler::crawler::run_crawl;
use crs_crawler::output::write_results;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// crs-crawler: collects terminal CRS URLs from an identifiers hierarchy
///
/// Starting from a listing document, every `identifier` child is followed
/// until a non-listing document is reached. The URLs of those documents are
/// printed to stdout, one per line; progress and errors go to stderr.
#[derive(Parser, Debug)]
#[command(name = "crs-crawler")]
#[command(version)]
#[command(about = "Crawl CRS URLs from a starting XML document", long_about = None)]
struct Cli {
    /// The starting URL pointing to an XML identifiers document
    /// [default: https://www.opengis.net/def/crs/]
    #[arg(value_name = "START_URL")]
    start_url: Option<String>,

    /// Number of concurrent workers [default: 8]
    #[arg(short, long = "parallel", value_name = "N")]
    parallel: Option<u32>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    let result = run_crawl(config).await.context("crawl aborted")?;

    let stdout = std::io::stdout();
    write_results(&mut stdout.lock(), &result).context("failed to write results")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries only the result listing.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crs_crawler=info,warn"),
            1 => EnvFilter::new("crs_crawler=debug,info"),
            2 => EnvFilter::new("crs_crawler=trace,debug"),
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

/// Layers command-line overrides on top of the config file or defaults
///
/// The merged settings are validated when the crawler is built.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(start_url) = &cli.start_url {
        config.crawler.start_url = start_url.clone();
    }
    if let Some(parallel) = cli.parallel {
        config.crawler.parallelism = parallel;
    }

    Ok(config)
}

//! # Contest Feed
//!
//! Collects upcoming competitive-programming contests from several online
//! judges, normalizes their start times to UTC, and writes one sorted JSON feed.
//!
//! ## Features
//!
//! - Scrapes Codeforces, Nowcoder, AtCoder, Luogu and LeetCode, each through the
//!   shape that platform happens to expose (JSON API, HTML table, GraphQL)
//! - Per-platform fallbacks (Codeforces HTML page, LeetCode secondary mirror)
//! - Per-platform failure isolation: one broken site never sinks the run
//! - Atomic output so readers never see a half-written file
//!
//! ## Usage
//!
//! ```sh
//! contest_feed -o ./web/contests.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Each scraper queries its platform through the shared client
//! 2. **Normalizing**: Rows are parsed, converted to UTC, filtered and truncated
//! 3. **Aggregating**: Results are tagged with their site and sorted by start
//! 4. **Output**: The snapshot is written as JSON via a temp file and rename

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod scrapers;
mod transport;
mod utils;

use aggregate::{Aggregator, SourceOutcome};
use cli::Cli;
use config::CrawlerConfig;
use outputs::json;
use transport::HttpClient;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("contest_feed starting up");

    let args = Cli::parse();
    debug!(?args.output, ?args.config, "Parsed CLI arguments");

    let mut config = CrawlerConfig::load(args.config.as_deref())?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
        config.validate()?;
    }
    debug!(?config, "Effective configuration");

    let http = HttpClient::new(&config)?;
    let aggregator = Aggregator::from_config(&config);
    let (snapshot, report) = aggregator.run(&http, Utc::now()).await;

    for (site, outcome) in &report.outcomes {
        match outcome {
            SourceOutcome::Fetched(count) => info!(source = %site, count, "Source summary"),
            SourceOutcome::Failed(reason) => warn!(source = %site, %reason, "Source summary"),
        }
    }

    let output = PathBuf::from(&args.output);
    if let Err(e) = json::write_snapshot(&snapshot, &output).await {
        error!(path = %output.display(), error = %e, "Failed to write contest feed");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        contests = snapshot.contests.len(),
        failed_sources = report.failed().count(),
        "Execution complete"
    );

    println!("✓ Fetched {} contests", snapshot.contests.len());
    println!("Output file: {}", output.display());
    Ok(())
}

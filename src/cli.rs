//! Command-line interface definitions for the contest feed.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every argument can also be provided through an environment variable.

use clap::Parser;

/// Command-line arguments for the contest feed.
///
/// # Examples
///
/// ```sh
/// # Write ./contests.json with default settings
/// contest_feed
///
/// # Explicit output path and a config file
/// contest_feed -o /srv/web/contests.json -c ./crawler.yaml
///
/// # Fetch all five platforms at once
/// contest_feed --concurrency 5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the JSON feed to write
    #[arg(short, long, env = "CONTESTS_OUTPUT", default_value = "contests.json")]
    pub output: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "CONTESTS_CONFIG")]
    pub config: Option<String>,

    /// Number of platforms fetched concurrently (overrides the config file)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

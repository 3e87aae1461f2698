//! Contest scrapers, one per platform.
//!
//! Each scraper implements [`ContestSource`] and owns its whole fallback chain:
//! which endpoints to try, in what order, and how to read each response.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Fallback |
//! |--------|--------|--------|----------|
//! | Codeforces | [`codeforces`] | JSON API | HTML contests table |
//! | Nowcoder | [`nowcoder`] | HTML blocks | none |
//! | AtCoder | [`atcoder`] | HTML table | none |
//! | Luogu | [`luogu`] | content-only JSON | none |
//! | LeetCode | [`leetcode`] | GraphQL (leetcode.cn) | GraphQL (leetcode.com) |
//!
//! # Common Patterns
//!
//! - Parsing lives in plain synchronous functions that take the response body,
//!   so it can be tested without a network and so `scraper::Html` never crosses
//!   an `.await`
//! - A row that cannot be read is skipped; it never fails the scraper
//! - Output goes through [`finalize`] (dedupe, sort, truncate)
//! - `Err` is returned only when no endpoint produced a usable response

pub mod atcoder;
pub mod codeforces;
pub mod html;
pub mod leetcode;
pub mod luogu;
pub mod nowcoder;

use crate::config::CrawlerConfig;
use crate::error::SourceError;
use crate::models::{RawContest, Site};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;

/// A platform that can list its upcoming contests.
#[async_trait]
pub trait ContestSource: Send + Sync {
    fn site(&self) -> Site;

    /// Fetch at most `limit` contests, sorted by start time.
    ///
    /// `now` is the reference instant for dropping contests that already began.
    async fn fetch(
        &self,
        http: &dyn Transport,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RawContest>, SourceError>;
}

/// Build one scraper per platform, in feed order.
pub fn all_sources(config: &CrawlerConfig) -> Vec<Box<dyn ContestSource>> {
    Site::ALL
        .into_iter()
        .map(|site| source_for(site, config))
        .collect()
}

/// The scraper responsible for `site`.
pub fn source_for(site: Site, config: &CrawlerConfig) -> Box<dyn ContestSource> {
    match site {
        Site::Codeforces => Box::new(codeforces::Codeforces),
        Site::Nowcoder => Box::new(nowcoder::Nowcoder),
        Site::AtCoder => Box::new(atcoder::AtCoder),
        Site::Luogu => Box::new(luogu::Luogu::new(config.millis_threshold)),
        Site::LeetCode => Box::new(leetcode::LeetCode::new(config.millis_threshold)),
    }
}

/// Drop exact duplicates, sort by start time and keep the first `limit` rows.
pub fn finalize(rows: Vec<RawContest>, limit: usize) -> Vec<RawContest> {
    rows.into_iter()
        .unique_by(|r| (r.name.clone(), r.start))
        .sorted_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)))
        .take(limit)
        .collect()
}

/// Keep rows that have not started yet (a start equal to `now` counts as upcoming).
pub fn not_started(rows: Vec<RawContest>, now: DateTime<Utc>) -> Vec<RawContest> {
    rows.into_iter().filter(|r| r.start >= now).collect()
}

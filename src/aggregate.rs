//! Runs every scraper and merges the results into one [`Snapshot`].
//!
//! Failures are isolated per source: an `Err` or even a panic inside one
//! scraper is logged under that source's display name and counted as zero
//! contests, while every other source contributes normally.

use crate::config::CrawlerConfig;
use crate::models::{Contest, Site, Snapshot};
use crate::scrapers::{ContestSource, all_sources};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// A configured source: which site, how many contests to keep, and the scraper.
pub struct SourceSpec {
    pub site: Site,
    pub limit: usize,
    pub adapter: Box<dyn ContestSource>,
}

impl SourceSpec {
    pub fn new(adapter: Box<dyn ContestSource>, limit: usize) -> Self {
        Self {
            site: adapter.site(),
            limit,
            adapter,
        }
    }
}

/// What happened to one source during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Fetched(usize),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<(Site, SourceOutcome)>,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = Site> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SourceOutcome::Failed(_)))
            .map(|(site, _)| *site)
    }
}

pub struct Aggregator {
    sources: Vec<SourceSpec>,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(sources: Vec<SourceSpec>, concurrency: usize) -> Self {
        Self {
            sources,
            concurrency: concurrency.max(1),
        }
    }

    /// All five platforms with the limits and concurrency from `config`.
    pub fn from_config(config: &CrawlerConfig) -> Self {
        let sources = all_sources(config)
            .into_iter()
            .map(|adapter| {
                let limit = config.limit(adapter.site());
                SourceSpec::new(adapter, limit)
            })
            .collect();
        Self::new(sources, config.concurrency)
    }

    /// Fetch every source and build the sorted snapshot stamped with `now`.
    ///
    /// # Arguments
    ///
    /// * `http` - Transport handed to every scraper
    /// * `now` - Reference instant for the upcoming filter and `generated_at`
    ///
    /// # Returns
    ///
    /// The snapshot and a per-site [`RunReport`]. Never fails: a source that
    /// errors or panics is reported and contributes no contests.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len(), concurrency = self.concurrency))]
    pub async fn run(&self, http: &dyn Transport, now: DateTime<Utc>) -> (Snapshot, RunReport) {
        let t0 = Instant::now();

        let results: Vec<(Site, Result<Vec<Contest>, String>)> = stream::iter(&self.sources)
            .map(|spec| fetch_one(spec, http, now))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut contests = Vec::new();
        let mut report = RunReport::default();
        for (site, result) in results {
            match result {
                Ok(rows) => {
                    report.outcomes.push((site, SourceOutcome::Fetched(rows.len())));
                    contests.extend(rows);
                }
                Err(reason) => report.outcomes.push((site, SourceOutcome::Failed(reason))),
            }
        }
        report.outcomes.sort_by_key(|(site, _)| *site);

        let snapshot = Snapshot::new(now, contests);
        info!(
            total = snapshot.contests.len(),
            failed = report.failed().count(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Aggregated contests"
        );
        (snapshot, report)
    }
}

async fn fetch_one(
    spec: &SourceSpec,
    http: &dyn Transport,
    now: DateTime<Utc>,
) -> (Site, Result<Vec<Contest>, String>) {
    let site = spec.site;
    let attempt = AssertUnwindSafe(spec.adapter.fetch(http, spec.limit, now))
        .catch_unwind()
        .await;

    let result = match attempt {
        Ok(Ok(mut rows)) => {
            if rows.len() > spec.limit {
                warn!(source = site.display_name(), got = rows.len(), limit = spec.limit, "Source exceeded its limit; truncating");
                rows.truncate(spec.limit);
            }
            info!(source = site.display_name(), count = rows.len(), "Source fetched");
            Ok(rows.into_iter().map(|r| r.tag(site)).collect())
        }
        Ok(Err(e)) => {
            warn!(source = site.display_name(), error = %e, "Source failed; contributing no contests");
            Err(e.to_string())
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(source = site.display_name(), %reason, "Source panicked; contributing no contests");
            Err(format!("panic: {reason}"))
        }
    };
    (site, result)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::RawContest;
    use crate::scrapers::{codeforces, leetcode, luogu, nowcoder};
    use crate::transport::stub::StubTransport;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
    }

    enum Behaviour {
        Rows(Vec<RawContest>),
        Fail,
        Panic,
    }

    struct FakeSource {
        site: Site,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl ContestSource for FakeSource {
        fn site(&self) -> Site {
            self.site
        }

        async fn fetch(
            &self,
            _http: &dyn Transport,
            _limit: usize,
            _now: DateTime<Utc>,
        ) -> Result<Vec<RawContest>, SourceError> {
            match &self.behaviour {
                Behaviour::Rows(rows) => Ok(rows.clone()),
                Behaviour::Fail => Err(SourceError::Malformed("schema drift".into())),
                Behaviour::Panic => panic!("selector exploded"),
            }
        }
    }

    fn rows(prefix: &str, hours: &[i64]) -> Vec<RawContest> {
        hours
            .iter()
            .map(|h| RawContest::new(&format!("{prefix} {h}"), now() + Duration::hours(*h)).unwrap())
            .collect()
    }

    fn fake(site: Site, behaviour: Behaviour, limit: usize) -> SourceSpec {
        SourceSpec::new(Box::new(FakeSource { site, behaviour }), limit)
    }

    fn fetched(report: &RunReport, site: Site) -> usize {
        match report.outcomes.iter().find(|(s, _)| *s == site) {
            Some((_, SourceOutcome::Fetched(n))) => *n,
            _ => 0,
        }
    }

    fn assert_sorted(snapshot: &Snapshot) {
        assert!(snapshot.contests.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[tokio::test]
    async fn test_merges_and_sorts_across_sources() {
        let aggregator = Aggregator::new(
            vec![
                fake(Site::Codeforces, Behaviour::Rows(rows("cf", &[30, 5])), 6),
                fake(Site::AtCoder, Behaviour::Rows(rows("ac", &[10, 1])), 5),
            ],
            1,
        );
        let (snapshot, report) = aggregator.run(&StubTransport::new(), now()).await;
        assert_eq!(snapshot.generated_at, now());
        assert_eq!(snapshot.contests.len(), 4);
        assert_sorted(&snapshot);
        assert_eq!(snapshot.contests[0].site, Site::AtCoder);
        assert_eq!(fetched(&report, Site::Codeforces), 2);
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_isolated() {
        let aggregator = Aggregator::new(
            vec![
                fake(Site::Codeforces, Behaviour::Rows(rows("cf", &[1, 2])), 6),
                fake(Site::Nowcoder, Behaviour::Fail, 6),
                fake(Site::AtCoder, Behaviour::Panic, 5),
                fake(Site::Luogu, Behaviour::Rows(rows("lg", &[3])), 5),
            ],
            2,
        );
        let (snapshot, report) = aggregator.run(&StubTransport::new(), now()).await;
        assert_eq!(snapshot.contests.len(), 3);
        assert_sorted(&snapshot);

        let failed: Vec<Site> = report.failed().collect();
        assert_eq!(failed, vec![Site::Nowcoder, Site::AtCoder]);
        assert!(matches!(
            &report.outcomes[2],
            (Site::AtCoder, SourceOutcome::Failed(reason)) if reason.contains("selector exploded")
        ));
    }

    #[tokio::test]
    async fn test_limit_enforced_at_boundary() {
        let aggregator = Aggregator::new(
            vec![fake(Site::LeetCode, Behaviour::Rows(rows("lc", &[1, 2, 3, 4, 5])), 3)],
            1,
        );
        let (snapshot, _) = aggregator.run(&StubTransport::new(), now()).await;
        assert_eq!(snapshot.contests.len(), 3);
    }

    #[tokio::test]
    async fn test_all_empty_still_produces_snapshot() {
        let aggregator = Aggregator::from_config(&CrawlerConfig::default());
        let (snapshot, report) = aggregator.run(&StubTransport::new(), now()).await;
        assert!(snapshot.contests.is_empty());
        assert_eq!(snapshot.generated_at, now());
        assert_eq!(report.outcomes.len(), 5);
    }

    #[tokio::test]
    async fn test_fallback_mirror_example() {
        let api = r#"{"status": "OK", "result": [
            {"name": "Codeforces Round 1010", "phase": "BEFORE", "startTimeSeconds": 1746540000},
            {"name": "Codeforces Round 1009", "phase": "BEFORE", "startTimeSeconds": 1746280800}
        ]}"#;
        let lc_secondary = r#"{"data": {"contestUpcomingContests": [
            {"title": "Weekly Contest 448", "startTime": 1746325800}
        ]}}"#;
        let http = StubTransport::new()
            .with_body(codeforces::API_URLS[0], api)
            .with_body(leetcode::PRIMARY_ENDPOINT, r#"{"data": {"contestUpcomingContests": []}}"#)
            .with_body(leetcode::SECONDARY_ENDPOINT, lc_secondary);

        let (snapshot, report) = Aggregator::from_config(&CrawlerConfig::default())
            .run(&http, now())
            .await;

        let got: Vec<(Site, &str)> = snapshot
            .contests
            .iter()
            .map(|c| (c.site, c.name.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (Site::Codeforces, "Codeforces Round 1009"),
                (Site::LeetCode, "Weekly Contest 448"),
                (Site::Codeforces, "Codeforces Round 1010"),
            ]
        );
        assert_eq!(fetched(&report, Site::LeetCode), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_affects_only_that_source() {
        let nowcoder_page = r#"<div class="platform-item-main"><h4><a>周赛</a></h4>
            <ul><li>比赛时间：2025-05-18 19:00 至 2025-05-18 21:00</li></ul></div>"#;
        let luogu_body = r#"{"currentData": {"contests": {"result": [
            {"name": "月赛", "startTime": 1747220400}
        ]}}}"#;
        let healthy = || {
            StubTransport::new()
                .with_body(nowcoder::CONTEST_PAGE, nowcoder_page)
                .with_body(luogu::CONTEST_LIST, luogu_body)
        };

        let aggregator = Aggregator::from_config(&CrawlerConfig::default());
        let (baseline, _) = aggregator.run(&healthy(), now()).await;
        assert_eq!(baseline.contests.len(), 2);

        let degraded = healthy().with_status(nowcoder::CONTEST_PAGE, 503);
        let (snapshot, report) = aggregator.run(&degraded, now()).await;
        assert_eq!(snapshot.contests.len(), 1);
        assert_eq!(snapshot.contests[0].site, Site::Luogu);
        assert_eq!(fetched(&report, Site::Nowcoder), 0);
        assert_eq!(fetched(&report, Site::Luogu), 1);
    }
}

//! Codeforces contest scraper.
//!
//! The public API at `/api/contest.list` is the primary source. It reports start
//! times as UTC epoch seconds and a `phase` per contest; only `BEFORE` and
//! `CODING` are kept, so contests already running stay in the feed.
//!
//! When both API variants fail or return nothing usable, the `/contests` HTML page
//! is read instead: the table after the "Upcoming Contests" heading carries a
//! `data-starttime` attribute on each row.

use super::html::{table_after_heading, text_of};
use super::{ContestSource, finalize};
use crate::error::SourceError;
use crate::models::{RawContest, Site};
use crate::transport::Transport;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

pub const API_URLS: [&str; 2] = [
    "https://codeforces.com/api/contest.list?gym=false",
    "https://codeforces.com/api/contest.list",
];
pub const CONTESTS_PAGE: &str = "https://codeforces.com/contests";

const LIVE_PHASES: [&str; 2] = ["BEFORE", "CODING"];

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiContest {
    name: String,
    phase: String,
    #[serde(rename = "startTimeSeconds")]
    start_time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Codeforces;

#[async_trait]
impl ContestSource for Codeforces {
    fn site(&self) -> Site {
        Site::Codeforces
    }

    #[instrument(level = "info", skip(self, http))]
    async fn fetch(
        &self,
        http: &dyn Transport,
        limit: usize,
        _now: DateTime<Utc>,
    ) -> Result<Vec<RawContest>, SourceError> {
        for url in API_URLS {
            match http.get(url, &[]).await {
                Ok(page) => match parse_api(&page.body) {
                    Ok(rows) if !rows.is_empty() => {
                        info!(count = rows.len(), %url, "Read Codeforces API");
                        return Ok(finalize(rows, limit));
                    }
                    Ok(_) => debug!(%url, "Codeforces API listed no live contests"),
                    Err(e) => warn!(
                        %url,
                        error = %e,
                        body = %truncate_for_log(&page.body, 200),
                        "Codeforces API response unusable"
                    ),
                },
                Err(e) => warn!(%url, error = %e, "Codeforces API unavailable"),
            }
        }

        info!("Falling back to Codeforces contests page");
        let page = http.get(CONTESTS_PAGE, &[]).await?;
        let rows = parse_contests_page(&page.body, limit);
        info!(count = rows.len(), url = %page.url, "Read Codeforces contests page");
        Ok(finalize(rows, limit))
    }
}

/// Read `contest.list` output, keeping contests that have not finished.
pub fn parse_api(body: &str) -> Result<Vec<RawContest>, SourceError> {
    let envelope: ApiEnvelope = serde_json::from_str(body)?;
    if envelope.status != "OK" {
        return Err(SourceError::Malformed(format!(
            "api status {}",
            envelope.status
        )));
    }

    let rows = envelope
        .result
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ApiContest>(value).ok())
        .filter(|c| LIVE_PHASES.contains(&c.phase.as_str()))
        .filter_map(|c| {
            let start = DateTime::from_timestamp(c.start_time_seconds?, 0)?;
            RawContest::new(&c.name, start)
        })
        .collect();
    Ok(rows)
}

/// Read the upcoming table of the `/contests` page, stopping after `limit` rows.
pub fn parse_contests_page(body: &str, limit: usize) -> Vec<RawContest> {
    let doc = Html::parse_document(body);
    let Some(table) = table_after_heading(&doc, &["h2", "h3"], "Upcoming Contests") else {
        debug!("No upcoming table on Codeforces page");
        return Vec::new();
    };

    let mut rows = Vec::new();
    for tr in table.select(&ROW) {
        let Some(start) = tr
            .value()
            .attr("data-starttime")
            .and_then(|ts| ts.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            continue;
        };
        let name = tr.select(&LINK).next().map(text_of).unwrap_or_else(|| text_of(tr));
        if let Some(row) = RawContest::new(&name, start) {
            rows.push(row);
        }
        if rows.len() >= limit {
            break;
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::StubTransport;
    use chrono::TimeZone;

    const API_BODY: &str = r#"{
        "status": "OK",
        "result": [
            {"id": 3, "name": "Codeforces Round 952 (Div. 2)", "phase": "BEFORE", "startTimeSeconds": 1718000000},
            {"id": 2, "name": " Codeforces Round 951 (Div. 1) ", "phase": "BEFORE", "startTimeSeconds": 1717000000},
            {"id": 1, "name": "Educational Round 160", "phase": "CODING", "startTimeSeconds": 1716000000},
            {"id": 0, "name": "Old Round", "phase": "FINISHED", "startTimeSeconds": 1600000000},
            {"id": 9, "name": "No time yet", "phase": "BEFORE"},
            {"id": 8, "phase": "BEFORE", "startTimeSeconds": 1719000000}
        ]
    }"#;

    const PAGE_BODY: &str = r#"
        <html><body>
          <div class="datatable">
            <h3>Upcoming Contests</h3>
            <table>
              <tr><th>Name</th><th>Start</th></tr>
              <tr data-starttime="1718000000"><td><a href="/contests/1990">Codeforces Round 960</a></td></tr>
              <tr data-starttime="garbage"><td><a href="/contests/1991">Broken row</a></td></tr>
              <tr data-starttime="1717000000"><td>Plain Text Round</td></tr>
              <tr data-starttime="1719000000"><td><a>Third Round</a></td></tr>
            </table>
          </div>
        </body></html>
    "#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_api_filters_phase_and_bad_rows() {
        let rows = parse_api(API_BODY).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Codeforces Round 952 (Div. 2)",
                "Codeforces Round 951 (Div. 1)",
                "Educational Round 160"
            ]
        );
    }

    #[test]
    fn test_parse_api_rejects_failed_status() {
        let body = r#"{"status": "FAILED", "comment": "Call limit exceeded"}"#;
        assert!(matches!(parse_api(body), Err(SourceError::Malformed(_))));
        assert!(parse_api("<html>").is_err());
    }

    #[test]
    fn test_parse_contests_page() {
        let rows = parse_contests_page(PAGE_BODY, 10);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Codeforces Round 960", "Plain Text Round", "Third Round"]);
        assert_eq!(rows[0].start.timestamp(), 1_718_000_000);
    }

    #[test]
    fn test_parse_contests_page_stops_at_limit() {
        assert_eq!(parse_contests_page(PAGE_BODY, 1).len(), 1);
        assert!(parse_contests_page("<html><table></table></html>", 5).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_uses_api_sorted_and_limited() {
        let http = StubTransport::new().with_body(API_URLS[0], API_BODY);
        let rows = Codeforces.fetch(&http, 2, now()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Educational Round 160");
        assert!(rows[0].start <= rows[1].start);
        assert_eq!(http.calls(), vec![API_URLS[0]]);
    }

    #[tokio::test]
    async fn test_fetch_tries_second_api_then_page() {
        let empty = r#"{"status": "OK", "result": []}"#;
        let http = StubTransport::new()
            .with_status(API_URLS[0], 503)
            .with_body(API_URLS[1], empty)
            .with_body(CONTESTS_PAGE, PAGE_BODY);
        let rows = Codeforces.fetch(&http, 6, now()).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Plain Text Round");
        assert_eq!(http.calls(), vec![API_URLS[0], API_URLS[1], CONTESTS_PAGE]);
    }

    #[tokio::test]
    async fn test_fetch_everything_down() {
        let http = StubTransport::new();
        let result = Codeforces.fetch(&http, 6, now()).await;
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }
}

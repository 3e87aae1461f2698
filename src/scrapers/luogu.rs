//! Luogu contest scraper.
//!
//! Requesting the contest list with `_contentOnly=1` (plus the `Referer` and
//! `x-luogu-type` headers the site expects) returns the page's data as JSON
//! instead of HTML. Contests live under `currentData.contests.result`; newer
//! deployments have served the same list under `data.contests.result`.
//!
//! `startTime` has been seen both in seconds and in milliseconds, so it goes
//! through the shared magnitude heuristic.

use super::{ContestSource, finalize, not_started};
use crate::error::SourceError;
use crate::models::{RawContest, Site};
use crate::transport::Transport;
use crate::utils::{china_offset, stamp_to_utc, truncate_for_log};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const CONTEST_LIST: &str = "https://www.luogu.com.cn/contest/list?page=1&_contentOnly=1";
pub const REFERER: &str = "https://www.luogu.com.cn/contest/list";

const RESULT_POINTERS: [&str; 2] = ["/currentData/contests/result", "/data/contests/result"];

#[derive(Debug, Clone, Copy)]
pub struct Luogu {
    millis_threshold: i64,
}

impl Luogu {
    pub fn new(millis_threshold: i64) -> Self {
        Self { millis_threshold }
    }
}

#[async_trait]
impl ContestSource for Luogu {
    fn site(&self) -> Site {
        Site::Luogu
    }

    #[instrument(level = "info", skip(self, http))]
    async fn fetch(
        &self,
        http: &dyn Transport,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RawContest>, SourceError> {
        let headers = [("Referer", REFERER), ("x-luogu-type", "content-only")];
        let page = http.get(CONTEST_LIST, &headers).await?;
        let rows = match parse_contest_list(&page.body, self.millis_threshold) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    url = %page.url,
                    error = %e,
                    body = %truncate_for_log(&page.body, 200),
                    "Luogu response unusable"
                );
                Vec::new()
            }
        };
        let rows = not_started(rows, now);
        info!(count = rows.len(), "Read Luogu contest list");
        Ok(finalize(rows, limit))
    }
}

/// Read the nested contest list from a content-only response.
pub fn parse_contest_list(body: &str, millis_threshold: i64) -> Result<Vec<RawContest>, SourceError> {
    let doc: Value = serde_json::from_str(body)?;
    let list = RESULT_POINTERS
        .iter()
        .find_map(|p| doc.pointer(p).and_then(Value::as_array))
        .ok_or_else(|| SourceError::Malformed("no contests.result list".into()))?;

    let offset = china_offset();
    Ok(list
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?;
            let start = stamp_to_utc(item.get("startTime")?, offset, millis_threshold)?;
            RawContest::new(name, start)
        })
        .collect())
}

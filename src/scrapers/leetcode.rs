//! LeetCode contest scraper.
//!
//! Both regional sites answer the same GraphQL query. leetcode.cn is asked
//! first; when it yields no usable entries (unreachable, error payload, or an
//! empty list) the query is repeated against leetcode.com.
//!
//! Each mirror carries its own timezone for textual timestamps: Beijing time on
//! leetcode.cn, UTC on leetcode.com. Numeric epochs are absolute either way.

use super::{ContestSource, finalize, not_started};
use crate::error::SourceError;
use crate::models::{RawContest, Site};
use crate::transport::Transport;
use crate::utils::{china_offset, stamp_to_utc};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

pub const PRIMARY_ENDPOINT: &str = "https://leetcode.cn/graphql";
pub const SECONDARY_ENDPOINT: &str = "https://leetcode.com/graphql";

const UPCOMING_QUERY: &str = "{ contestUpcomingContests { title startTime } }";

/// One regional deployment of the GraphQL API.
#[derive(Debug, Clone)]
pub struct Mirror {
    pub endpoint: &'static str,
    pub referer: &'static str,
    pub offset: FixedOffset,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<UpcomingData>,
}

#[derive(Debug, Deserialize)]
struct UpcomingData {
    #[serde(rename = "contestUpcomingContests", alias = "contestUpcoming", default)]
    contests: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct LeetCode {
    mirrors: Vec<Mirror>,
    millis_threshold: i64,
}

impl LeetCode {
    pub fn new(millis_threshold: i64) -> Self {
        let utc = FixedOffset::east_opt(0).unwrap();
        Self {
            mirrors: vec![
                Mirror {
                    endpoint: PRIMARY_ENDPOINT,
                    referer: "https://leetcode.cn/contest/",
                    offset: china_offset(),
                },
                Mirror {
                    endpoint: SECONDARY_ENDPOINT,
                    referer: "https://leetcode.com/contest/",
                    offset: utc,
                },
            ],
            millis_threshold,
        }
    }

    async fn query_mirror(
        &self,
        http: &dyn Transport,
        mirror: &Mirror,
    ) -> Result<Vec<RawContest>, SourceError> {
        let body = json!({ "query": UPCOMING_QUERY, "variables": {} });
        let headers = [("Referer", mirror.referer)];
        let page = http.post_json(mirror.endpoint, &body, &headers).await?;
        parse_upcoming(&page.body, mirror.offset, self.millis_threshold)
    }
}

#[async_trait]
impl ContestSource for LeetCode {
    fn site(&self) -> Site {
        Site::LeetCode
    }

    #[instrument(level = "info", skip(self, http))]
    async fn fetch(
        &self,
        http: &dyn Transport,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RawContest>, SourceError> {
        let mut last_error = None;
        let mut answered = false;

        for mirror in &self.mirrors {
            match self.query_mirror(http, mirror).await {
                Ok(rows) => {
                    answered = true;
                    let rows = not_started(rows, now);
                    if !rows.is_empty() {
                        info!(count = rows.len(), endpoint = mirror.endpoint, "Read LeetCode contests");
                        return Ok(finalize(rows, limit));
                    }
                    debug!(endpoint = mirror.endpoint, "LeetCode mirror listed no upcoming contests");
                }
                Err(e) => {
                    warn!(endpoint = mirror.endpoint, error = %e, "LeetCode mirror unusable");
                    last_error = Some(e);
                }
            }
        }

        // an honest empty list from any mirror is not an error
        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(Vec::new()),
        }
    }
}

/// Read a GraphQL response body; entries without a title or readable time are skipped.
pub fn parse_upcoming(
    body: &str,
    offset: FixedOffset,
    millis_threshold: i64,
) -> Result<Vec<RawContest>, SourceError> {
    let response: GraphqlResponse = serde_json::from_str(body)?;
    let data = response
        .data
        .ok_or_else(|| SourceError::Malformed("graphql response without data".into()))?;

    Ok(data
        .contests
        .iter()
        .filter_map(|item| {
            let title = item.get("title")?.as_str()?;
            let start = stamp_to_utc(item.get("startTime")?, offset, millis_threshold)?;
            RawContest::new(title, start)
        })
        .collect())
}

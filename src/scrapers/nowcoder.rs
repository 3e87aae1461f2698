//! Nowcoder contest scraper.
//!
//! Reads the "vip-index" contest page. Every contest is a `.platform-item-main`
//! block whose `h4` holds the title (followed by status badges such as "报名中"
//! or a "距离比赛开始还有…" countdown) and whose list items include one
//! reading `比赛时间：2025-05-10 19:00 至 2025-05-10 21:00`.
//!
//! Times are Beijing wall-clock (UTC+8).

use super::html::text_of;
use super::{ContestSource, finalize, not_started};
use crate::error::SourceError;
use crate::models::{RawContest, Site};
use crate::transport::Transport;
use crate::utils::{china_offset, parse_local_time};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

pub const CONTEST_PAGE: &str = "https://ac.nowcoder.com/acm/contest/vip-index";

static BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse(".platform-item-main").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h4").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h4 a").unwrap());
static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());

static CONTEST_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"比赛时间\s*[：:]\s*(\d{4}-\d{2}-\d{2})\s+(\d{2}:\d{2})").unwrap()
});
// badges can stack, e.g. "报名中" followed by a countdown
static TITLE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s*(?:报名中|进行中|已结束|距离.*))+\s*$").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct Nowcoder;

#[async_trait]
impl ContestSource for Nowcoder {
    fn site(&self) -> Site {
        Site::Nowcoder
    }

    #[instrument(level = "info", skip(self, http))]
    async fn fetch(
        &self,
        http: &dyn Transport,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RawContest>, SourceError> {
        let page = http.get(CONTEST_PAGE, &[]).await?;
        let rows = not_started(parse_contest_page(&page.body), now);
        info!(count = rows.len(), url = %page.url, "Read Nowcoder contest page");
        Ok(finalize(rows, limit))
    }
}

/// Read every contest block; blocks without a readable time are dropped.
pub fn parse_contest_page(body: &str) -> Vec<RawContest> {
    let doc = Html::parse_document(body);
    let mut rows = Vec::new();

    for block in doc.select(&BLOCK) {
        let title = block
            .select(&TITLE_LINK)
            .next()
            .or_else(|| block.select(&TITLE).next())
            .map(text_of);
        let Some(title) = title else {
            continue;
        };
        let start = block
            .select(&ITEM)
            .map(text_of)
            .find_map(|text| parse_contest_time(&text));
        let Some(start) = start else {
            debug!(%title, "Nowcoder block without contest time");
            continue;
        };
        if let Some(row) = RawContest::new(&clean_title(&title), start) {
            rows.push(row);
        }
    }
    rows
}

/// Strip trailing status badges and countdowns from a title.
pub fn clean_title(raw: &str) -> String {
    TITLE_NOISE.replace(raw.trim(), "").trim().to_string()
}

/// Extract the start of a `比赛时间：… 至 …` line as UTC.
pub fn parse_contest_time(text: &str) -> Option<DateTime<Utc>> {
    let caps = CONTEST_TIME.captures(text)?;
    parse_local_time(&format!("{} {}", &caps[1], &caps[2]), china_offset())
}

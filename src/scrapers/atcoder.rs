//! AtCoder contest scraper.
//!
//! The `/contests/` page lists upcoming contests in the table after the
//! "Upcoming Contests" heading. The first column holds a `<time>` such as
//! `2025-05-10 21:00:00+0900`; the second holds the title, prefixed by a
//! rating glyph (`Ⓐ`, `Ⓗ`, `◉`, ...) that is not part of the name.

use super::html::{table_after_heading, text_of};
use super::{ContestSource, finalize, not_started};
use crate::error::SourceError;
use crate::models::{RawContest, Site};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

pub const CONTESTS_PAGE: &str = "https://atcoder.jp/contests/";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static LEADING_GLYPHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{So}\p{Sm}\s]+").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct AtCoder;

#[async_trait]
impl ContestSource for AtCoder {
    fn site(&self) -> Site {
        Site::AtCoder
    }

    #[instrument(level = "info", skip(self, http))]
    async fn fetch(
        &self,
        http: &dyn Transport,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RawContest>, SourceError> {
        let page = http.get(CONTESTS_PAGE, &[]).await?;
        let rows = not_started(parse_upcoming_table(&page.body), now);
        info!(count = rows.len(), url = %page.url, "Read AtCoder contests page");
        Ok(finalize(rows, limit))
    }
}

pub fn parse_upcoming_table(body: &str) -> Vec<RawContest> {
    let doc = Html::parse_document(body);
    let Some(table) = table_after_heading(&doc, &["h2", "h3", "h4"], "Upcoming Contests") else {
        debug!("No upcoming table on AtCoder page");
        return Vec::new();
    };

    table
        .select(&ROW)
        .filter_map(|tr| {
            let mut cells = tr.select(&CELL);
            let when = text_of(cells.next()?);
            let title_cell = cells.next()?;
            let title = title_cell
                .select(&LINK)
                .next()
                .map(text_of)
                .unwrap_or_else(|| text_of(title_cell));
            let start = parse_start(&when)?;
            RawContest::new(&strip_glyph(&title), start)
        })
        .collect()
}

/// `2025-05-10 21:00:00+0900` to UTC.
pub fn parse_start(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(text.trim(), TIME_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn strip_glyph(title: &str) -> String {
    LEADING_GLYPHS.replace(title.trim(), "").trim().to_string()
}

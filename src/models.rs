//! Data models for contests and the aggregated feed.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Site`]: The closed set of platforms the feed draws from
//! - [`RawContest`]: An untagged contest as produced by a single scraper
//! - [`Contest`]: A source-tagged contest as it appears in the output
//! - [`Snapshot`]: The complete, sorted result of one run
//!
//! All instants are stored as `DateTime<Utc>`; the timezone of the upstream page
//! is resolved inside the scraper that read it.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A contest platform.
///
/// Serialized as its short code (`"cf"`, `"nk"`, ...), which is also the key used
/// for per-site limits in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Site {
    #[serde(rename = "cf")]
    Codeforces,
    #[serde(rename = "nk")]
    Nowcoder,
    #[serde(rename = "ac")]
    AtCoder,
    #[serde(rename = "lg")]
    Luogu,
    #[serde(rename = "lc")]
    LeetCode,
}

impl Site {
    pub const ALL: [Site; 5] = [
        Site::Codeforces,
        Site::Nowcoder,
        Site::AtCoder,
        Site::Luogu,
        Site::LeetCode,
    ];

    /// Short code written to the `site` field of the output.
    pub fn id(self) -> &'static str {
        match self {
            Site::Codeforces => "cf",
            Site::Nowcoder => "nk",
            Site::AtCoder => "ac",
            Site::Luogu => "lg",
            Site::LeetCode => "lc",
        }
    }

    /// Human-readable name used in logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Site::Codeforces => "Codeforces",
            Site::Nowcoder => "Nowcoder",
            Site::AtCoder => "AtCoder",
            Site::Luogu => "Luogu",
            Site::LeetCode => "LeetCode",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A contest as read from one platform, before it is tagged with its site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContest {
    pub name: String,
    pub start: DateTime<Utc>,
}

impl RawContest {
    /// Build a row, rejecting names that are empty after trimming.
    pub fn new(name: &str, start: DateTime<Utc>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            start,
        })
    }

    pub fn tag(self, site: Site) -> Contest {
        Contest {
            site,
            name: self.name,
            start: self.start,
        }
    }
}

/// A source-tagged contest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Contest {
    pub site: Site,
    pub name: String,
    #[serde(serialize_with = "serialize_start")]
    pub start: DateTime<Utc>,
}

impl Contest {
    /// Feed order: start time, then site, then name.
    pub fn feed_order(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.site.id().cmp(other.site.id()))
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// The output of one run.
///
/// # JSON shape
///
/// ```text
/// {
///   "generated_at": "2025-05-06T12:00:00.123456+00:00",
///   "contests": [
///     { "site": "cf", "name": "Codeforces Round 950", "start": "2025-05-07T14:35:00+00:00" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(serialize_with = "serialize_generated_at")]
    pub generated_at: DateTime<Utc>,
    pub contests: Vec<Contest>,
}

impl Snapshot {
    /// Build a snapshot, sorting `contests` into feed order.
    pub fn new(generated_at: DateTime<Utc>, mut contests: Vec<Contest>) -> Self {
        contests.sort_by(Contest::feed_order);
        Self {
            generated_at,
            contests,
        }
    }
}

/// `2025-05-07T14:35:00+00:00`
pub fn format_start(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Like [`format_start`], with microseconds appended when they are non-zero.
pub fn format_generated_at(t: &DateTime<Utc>) -> String {
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        format_start(t)
    } else {
        // drop sub-microsecond precision before formatting
        let trimmed = t.with_nanosecond(micros * 1_000).unwrap_or(*t);
        trimmed.to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}

fn serialize_start<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_start(t))
}

fn serialize_generated_at<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_generated_at(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 7, h, m, 0).unwrap()
    }

    #[test]
    fn test_raw_contest_rejects_blank_name() {
        assert!(RawContest::new("   ", at(1, 0)).is_none());
        let row = RawContest::new("  Round 1 \n", at(1, 0)).unwrap();
        assert_eq!(row.name, "Round 1");
    }

    #[test]
    fn test_site_serializes_as_code() {
        let json = serde_json::to_string(&Site::LeetCode).unwrap();
        assert_eq!(json, "\"lc\"");
        for site in Site::ALL {
            let back: Site = serde_json::from_str(&format!("\"{}\"", site.id())).unwrap();
            assert_eq!(back, site);
        }
    }

    #[test]
    fn test_contest_serialization() {
        let contest = RawContest::new("Codeforces Round 950", at(14, 35))
            .unwrap()
            .tag(Site::Codeforces);
        let json = serde_json::to_string(&contest).unwrap();
        assert_eq!(
            json,
            r#"{"site":"cf","name":"Codeforces Round 950","start":"2025-05-07T14:35:00+00:00"}"#
        );
    }

    #[test]
    fn test_generated_at_formatting() {
        let whole = at(12, 0);
        assert_eq!(format_generated_at(&whole), "2025-05-07T12:00:00+00:00");

        let fractional = whole.with_nanosecond(123_456_789).unwrap();
        assert_eq!(
            format_generated_at(&fractional),
            "2025-05-07T12:00:00.123456+00:00"
        );
    }

    #[test]
    fn test_snapshot_sorts_with_tie_breaks() {
        let contests = vec![
            RawContest::new("B", at(10, 0)).unwrap().tag(Site::LeetCode),
            RawContest::new("Z", at(9, 0)).unwrap().tag(Site::Luogu),
            RawContest::new("A", at(10, 0)).unwrap().tag(Site::LeetCode),
            RawContest::new("C", at(10, 0)).unwrap().tag(Site::AtCoder),
        ];
        let snapshot = Snapshot::new(at(8, 0), contests);
        let order: Vec<(&str, &str)> = snapshot
            .contests
            .iter()
            .map(|c| (c.site.id(), c.name.as_str()))
            .collect();
        assert_eq!(order, vec![("lg", "Z"), ("ac", "C"), ("lc", "A"), ("lc", "B")]);
    }

    #[test]
    fn test_snapshot_deserialization() {
        let json = r#"{
            "generated_at": "2025-05-07T08:00:00.500000+00:00",
            "contests": [
                {"site": "ac", "name": "ABC 400", "start": "2025-05-10T12:00:00+00:00"}
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.contests.len(), 1);
        assert_eq!(snapshot.contests[0].site, Site::AtCoder);
        assert_eq!(snapshot.contests[0].start, Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap());
    }
}

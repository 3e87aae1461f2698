//! Utility functions for timestamp normalization, string handling, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Epoch normalization with the seconds/milliseconds heuristic
//! - Fixed-offset conversion for platforms that publish local wall-clock times
//! - String truncation for logging upstream bodies
//! - Output directory bootstrap

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Epoch values above this are read as milliseconds.
///
/// One trillion seconds is tens of thousands of years away, while one trillion
/// milliseconds is September 2001, so the two ranges never overlap for real
/// contest dates.
pub const DEFAULT_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// UTC+8, used by the Chinese platforms.
pub fn china_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

/// Convert an upstream epoch value to a UTC instant.
///
/// Values strictly greater than `millis_threshold` are treated as milliseconds,
/// everything else as seconds. Non-positive values are rejected.
///
/// # Examples
///
/// ```ignore
/// let a = epoch_to_utc(1_715_000_000, DEFAULT_MILLIS_THRESHOLD);
/// let b = epoch_to_utc(1_715_000_000_000, DEFAULT_MILLIS_THRESHOLD);
/// assert_eq!(a, b);
/// ```
pub fn epoch_to_utc(raw: i64, millis_threshold: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }
    if raw > millis_threshold {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

/// Interpret a wall-clock time in `offset` and convert it to UTC.
pub fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a `YYYY-MM-DD HH:MM[:SS]` style string in `offset`.
///
/// Strings carrying their own offset (RFC 3339) keep it and ignore `offset`.
pub fn parse_local_time(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .and_then(|naive| local_to_utc(naive, offset))
}

/// Normalize a JSON timestamp field of unknown shape.
///
/// Accepts integers, floats, numeric strings (all through [`epoch_to_utc`]) and
/// textual wall-clock times (through [`parse_local_time`] in `offset`).
pub fn stamp_to_utc(
    value: &Value,
    offset: FixedOffset,
    millis_threshold: i64,
) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|raw| epoch_to_utc(raw, millis_threshold)),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(raw) => epoch_to_utc(raw, millis_threshold),
                Err(_) => parse_local_time(s, offset),
            }
        }
        _ => None,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (on a character boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Make sure the directory that will hold `path` exists.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).await?;
            debug!(dir = %dir.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}

//! Canonical UTC timestamp formatting for pipdb.
//!
//! Documents carry `wof:lastmodified` as Unix seconds and that is what the
//! tables store. These helpers render stored values as ISO 8601
//! with millisecond precision and the `Z` suffix (never `+00:00`).
//!
//! # Format
//! `YYYY-MM-DDTHH:MM:SS.mmmZ`  (e.g. `2026-02-12T14:30:00.123Z`)

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Format a `DateTime<Utc>` as an ISO 8601 string with `Z` suffix.
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format Unix seconds, returning `None` for values chrono cannot represent.
pub fn format_unix(secs: i64) -> Option<String> {
    Utc.timestamp_opt(secs, 0).single().map(|dt| format_utc(&dt))
}

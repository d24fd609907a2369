//! Timestamp parsing for loosely formatted event files.
//!
//! Accepts RFC 3339 as well as the space-separated form spreadsheet and
//! dataframe tools tend to write (`2024-03-01 08:15:00.250000+00:00`).
//! Offset-less values are read as UTC. Everything is normalized to UTC.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse a timestamp, returning `None` for blank or unrecognized input.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts.to_offset(UtcOffset::UTC));
    }

    let with_offset = [
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ];
    for fmt in with_offset {
        if let Ok(ts) = OffsetDateTime::parse(s, fmt) {
            return Some(ts.to_offset(UtcOffset::UTC));
        }
    }

    let naive = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ];
    naive
        .into_iter()
        .find_map(|fmt| PrimitiveDateTime::parse(s, fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
}

/// Format as RFC 3339 in UTC.
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(UtcOffset::UTC);
    utc.format(&Rfc3339).unwrap_or_else(|_| utc.to_string())
}

/// Seconds elapsed from `from` to `to`; negative when `to` is earlier.
pub fn seconds_between(from: OffsetDateTime, to: OffsetDateTime) -> f64 {
    (to - from).as_seconds_f64()
}

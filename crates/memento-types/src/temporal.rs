//! Timestamp helpers.
//!
//! All persisted timestamps are RFC 3339 in UTC. Transcript records written
//! by different tools disagree on precision (seconds, milliseconds,
//! microseconds), so parsing is lenient and comparison is done on
//! [`Timestamp`] values rather than strings.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::TypeError;

/// UTC instant used for commits, sessions, and transcript records.
pub type Timestamp = DateTime<Utc>;

/// Parse an RFC 3339 timestamp, or a bare integer of epoch seconds or
/// milliseconds.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, TypeError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(n) = s.parse::<i64>() {
        // Anything past year 33658 in seconds is treated as milliseconds.
        let parsed = if n.abs() >= 1_000_000_000_000 {
            Utc.timestamp_millis_opt(n).single()
        } else {
            Utc.timestamp_opt(n, 0).single()
        };
        return parsed.ok_or_else(|| TypeError::InvalidTimestamp(s.to_string()));
    }
    Err(TypeError::InvalidTimestamp(s.to_string()))
}

/// Format a timestamp as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

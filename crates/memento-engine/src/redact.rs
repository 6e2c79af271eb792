//! Targeted redaction of one transcript record.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use memento_scrub::blank_value;
use memento_types::{format_timestamp, parse_timestamp, SessionKey, Timestamp, Transcript};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Fields holding a record's conversational content, as JSON pointers.
const CONTENT_FIELDS: &[&str] = &["/message/content", "/content", "/payload/content"];

/// `tool/session@timestamp`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedactTarget {
    pub key: SessionKey,
    pub timestamp: Timestamp,
}

impl FromStr for RedactTarget {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || EngineError::InvalidTarget(format!("expected tool/session@timestamp, got '{s}'"));
        let (session, ts) = s.rsplit_once('@').ok_or_else(bad)?;
        let key: SessionKey = session.parse().map_err(|_| bad())?;
        let timestamp = parse_timestamp(ts).map_err(|_| bad())?;
        Ok(Self { key, timestamp })
    }
}

impl fmt::Display for RedactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.key, format_timestamp(&self.timestamp))
    }
}

/// Index of the record closest to `at`, if one lies within `tolerance`.
/// The earliest record wins a tie.
pub fn locate_record(transcript: &Transcript, at: Timestamp, tolerance: Duration) -> Option<usize> {
    let mut best: Option<(usize, Duration)> = None;
    for (i, record) in transcript.records().iter().enumerate() {
        let Some(ts) = record.timestamp() else {
            continue;
        };
        let distance = (ts - at).abs();
        if distance > tolerance {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Replace the content fields of record `index` with `placeholder`.
/// Returns how many fields were found.
pub fn redact_record(transcript: &mut Transcript, index: usize, placeholder: &str) -> usize {
    let Some(record) = transcript.records_mut().get_mut(index) else {
        return 0;
    };
    let mut found = 0;
    record.update(|value| {
        let mut changed = false;
        for pointer in CONTENT_FIELDS {
            if let Some(field) = value.pointer_mut(pointer) {
                found += 1;
                let blank = blank_value(field, placeholder);
                if *field != blank {
                    *field = blank;
                    changed = true;
                }
            }
        }
        changed
    });
    found
}

/// Redact the record at `at`, failing if no record is close enough.
pub fn redact_at(
    transcript: &mut Transcript,
    at: Timestamp,
    tolerance: Duration,
    placeholder: &str,
) -> EngineResult<usize> {
    let index = locate_record(transcript, at, tolerance).ok_or_else(|| {
        EngineError::NotFound(format!("no record at {}", format_timestamp(&at)))
    })?;
    Ok(redact_record(transcript, index, placeholder))
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE: &str = concat!(
        "{\"type\":\"user\",\"timestamp\":\"2025-01-01T10:00:00.000Z\",\"message\":{\"role\":\"user\",\"content\":\"first\"}}\n",
        "{\"type\":\"assistant\",\"timestamp\":\"2025-01-01T10:01:00.000Z\",\"message\":{\"role\":\"assistant\",\"content\":[{\"type\":\"text\",\"text\":\"secret plan\"}]}}\n",
        "{\"type\":\"user\",\"timestamp\":\"2025-01-01T10:02:00.000Z\",\"message\":{\"role\":\"user\",\"content\":\"third\"}}\n",
    );

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn parses_targets() {
        let t: RedactTarget = "claude/abc-1@2025-01-01T10:01:00Z".parse().unwrap();
        assert_eq!(t.key, SessionKey::new("claude", "abc-1"));
        assert_eq!(t.timestamp, ts("2025-01-01T10:01:00Z"));
        assert_eq!(t.to_string(), "claude/abc-1@2025-01-01T10:01:00.000Z");
        assert!("claude/abc".parse::<RedactTarget>().is_err());
        assert!("abc@2025-01-01T10:01:00Z".parse::<RedactTarget>().is_err());
        assert!("claude/abc@yesterday".parse::<RedactTarget>().is_err());
    }

    #[test]
    fn middle_record_only() {
        let mut t = Transcript::parse(THREE.as_bytes());
        let n = redact_at(
            &mut t,
            ts("2025-01-01T10:01:00.400Z"),
            Duration::milliseconds(1000),
            "[REDACTED]",
        )
        .unwrap();
        assert_eq!(n, 1);
        let out = String::from_utf8(t.to_bytes()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        let original: Vec<&str> = THREE.lines().collect();
        assert_eq!(lines[0], original[0]);
        assert_eq!(lines[2], original[2]);
        let middle: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(
            middle["message"]["content"],
            serde_json::json!([{"type": "text", "text": "[REDACTED]"}])
        );
        assert_eq!(middle["message"]["role"], "assistant");
    }

    #[test]
    fn outside_tolerance_is_not_found() {
        let mut t = Transcript::parse(THREE.as_bytes());
        let err = redact_at(
            &mut t,
            ts("2025-01-01T10:01:02Z"),
            Duration::milliseconds(1000),
            "[REDACTED]",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(t.to_bytes(), THREE.as_bytes());
    }

    #[test]
    fn closest_record_wins() {
        let t = Transcript::parse(THREE.as_bytes());
        let i = locate_record(&t, ts("2025-01-01T10:00:40Z"), Duration::seconds(60));
        assert_eq!(i, Some(1));
    }

    #[test]
    fn redacting_twice_is_stable() {
        let mut t = Transcript::parse(THREE.as_bytes());
        let at = ts("2025-01-01T10:01:00Z");
        redact_at(&mut t, at, Duration::zero(), "[R]").unwrap();
        let once = t.to_bytes();
        let mut again = Transcript::parse(&once);
        redact_at(&mut again, at, Duration::zero(), "[R]").unwrap();
        assert_eq!(again.to_bytes(), once);
    }
}

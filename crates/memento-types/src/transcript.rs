//! JSONL transcripts.
//!
//! A transcript is one JSON document per line. Lines that fail to parse
//! (including lines that are not valid UTF-8) are kept verbatim so a stored
//! blob never loses data, and are skipped by every stage that inspects
//! record contents. A record that nobody modified is written back with its
//! original bytes.

use std::borrow::Cow;

use serde_json::Value;
use tracing::warn;

use crate::temporal::{parse_timestamp, Timestamp};

/// One line of a transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    raw: Vec<u8>,
    value: Option<Value>,
    dirty: bool,
}

impl Record {
    /// Parse one line. Blank and malformed lines yield an unparsed record.
    pub fn parse(line: &[u8]) -> Self {
        let value = if line.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            serde_json::from_slice(line).ok()
        };
        Self {
            raw: line.to_vec(),
            value,
            dirty: false,
        }
    }

    /// Build a record from a value (serialized lazily on output).
    pub fn from_value(value: Value) -> Self {
        Self {
            raw: Vec::new(),
            value: Some(value),
            dirty: true,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_parsed(&self) -> bool {
        self.value.is_some()
    }

    /// Whether the record will be re-serialized on output.
    pub fn is_modified(&self) -> bool {
        self.dirty
    }

    /// Run `f` on the parsed value. `f` returns whether it changed anything;
    /// only then is the record re-serialized on output.
    pub fn update<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Value) -> bool,
    {
        let Some(value) = self.value.as_mut() else {
            return false;
        };
        let changed = f(value);
        self.dirty |= changed;
        changed
    }

    /// The record's top-level `timestamp`, if present and parseable.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.value
            .as_ref()?
            .get("timestamp")?
            .as_str()
            .and_then(|s| parse_timestamp(s).ok())
    }

    /// The record's top-level `type`, if present.
    pub fn kind(&self) -> Option<&str> {
        self.value.as_ref()?.get("type")?.as_str()
    }

    /// The line as it will be written back, without the newline.
    pub fn to_line(&self) -> Cow<'_, [u8]> {
        match (&self.value, self.dirty) {
            (Some(value), true) => Cow::Owned(value.to_string().into_bytes()),
            _ => Cow::Borrowed(&self.raw),
        }
    }
}

/// An ordered list of records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    records: Vec<Record>,
    trailing_newline: bool,
}

impl Transcript {
    /// Parse JSONL bytes. Malformed lines are logged and kept verbatim.
    pub fn parse(bytes: &[u8]) -> Self {
        let trailing_newline = bytes.ends_with(b"\n");
        let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        if body.is_empty() && !trailing_newline {
            return Self::default();
        }
        let records: Vec<Record> = body
            .split(|b| *b == b'\n')
            .enumerate()
            .map(|(i, line)| {
                let record = Record::parse(line);
                if !record.is_parsed() && !line.iter().all(u8::is_ascii_whitespace) {
                    warn!(line = i + 1, "skipping malformed transcript record");
                }
                record
            })
            .collect();
        Self {
            records,
            trailing_newline,
        }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            trailing_newline: true,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest record timestamps.
    pub fn span(&self) -> Option<(Timestamp, Timestamp)> {
        let mut stamps = self.records.iter().filter_map(Record::timestamp);
        let first = stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
    }

    /// Serialize back to JSONL.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(&record.to_line());
        }
        if self.trailing_newline && !self.records.is_empty() {
            out.push(b'\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = concat!(
        "{\"type\":\"user\",\"timestamp\":\"2025-01-01T10:00:00Z\",\"b\":1,\"a\":2}\n",
        "not json at all\n",
        "{\"type\":\"assistant\",\"timestamp\":\"2025-01-01T10:05:00.250Z\"}\n",
    );

    #[test]
    fn untouched_transcript_is_byte_identical() {
        let t = Transcript::parse(SAMPLE.as_bytes());
        assert_eq!(t.len(), 3);
        assert_eq!(t.to_bytes(), SAMPLE.as_bytes());
    }

    #[test]
    fn malformed_lines_are_kept_but_unparsed() {
        let t = Transcript::parse(SAMPLE.as_bytes());
        assert!(!t.records()[1].is_parsed());
        assert_eq!(&*t.records()[1].to_line(), b"not json at all");
    }

    #[test]
    fn update_only_rewrites_changed_records() {
        let mut t = Transcript::parse(SAMPLE.as_bytes());
        assert!(!t.records_mut()[0].update(|_| false));
        assert!(t.records_mut()[2].update(|v| {
            v["type"] = json!("system");
            true
        }));
        let out = String::from_utf8(t.to_bytes()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], SAMPLE.lines().next().unwrap());
        assert_eq!(
            lines[2],
            "{\"type\":\"system\",\"timestamp\":\"2025-01-01T10:05:00.250Z\"}"
        );
    }

    #[test]
    fn span_covers_all_timestamps() {
        let t = Transcript::parse(SAMPLE.as_bytes());
        let (lo, hi) = t.span().unwrap();
        assert_eq!(lo, parse_timestamp("2025-01-01T10:00:00Z").unwrap());
        assert_eq!(hi, parse_timestamp("2025-01-01T10:05:00.250Z").unwrap());
        assert_eq!(t.records()[0].kind(), Some("user"));
    }

    #[test]
    fn empty_input() {
        let t = Transcript::parse(b"");
        assert!(t.is_empty());
        assert!(t.span().is_none());
        assert!(t.to_bytes().is_empty());
    }

    #[test]
    fn invalid_utf8_line_survives_a_rewrite_of_its_neighbour() {
        let mut input = b"{\"content\":\"x".to_vec();
        input.extend_from_slice(&[0xff]);
        input.extend_from_slice(b"y\"}\n{\"type\":\"user\",\"content\":\"mid\"}\n");
        let mut t = Transcript::parse(&input);
        assert!(!t.records()[0].is_parsed());
        t.records_mut()[1].update(|v| {
            v["content"] = json!("[REDACTED]");
            true
        });
        let out = t.to_bytes();
        let first = out.split(|b| *b == b'\n').next().unwrap();
        assert_eq!(first, &input[..input.iter().position(|b| *b == b'\n').unwrap()]);
        assert!(out.ends_with(b"{\"type\":\"user\",\"content\":\"[REDACTED]\"}\n"));
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let t = Transcript::parse(b"{\"a\":1}");
        assert_eq!(t.to_bytes(), b"{\"a\":1}");
    }
}

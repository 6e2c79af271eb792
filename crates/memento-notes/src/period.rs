//! Work periods: the window of time whose transcript records belong to a
//! commit.
//!
//! Records outside the window stay in the stored blob. They are only
//! excluded from windowed views, so a later period can re-derive its view
//! from the same blob.

use memento_types::{Record, Timestamp, Transcript};

use crate::note::{latest_modified, Note, SessionEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkPeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl WorkPeriod {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Resolve the period for a commit.
    ///
    /// `end` is the previous commit's timestamp. Without one it falls back to
    /// the latest `modified` among `sessions`, and finally to `start`.
    pub fn resolve(
        start: Timestamp,
        previous_commit: Option<Timestamp>,
        sessions: &[SessionEntry],
    ) -> Self {
        let end = previous_commit
            .or_else(|| latest_modified(sessions))
            .unwrap_or(start);
        Self::new(start, end)
    }

    /// The period of a noted commit.
    pub fn for_note(note: &Note, previous_commit: Option<Timestamp>) -> Self {
        Self::resolve(note.start_work, previous_commit, &note.sessions)
    }

    /// Lower and upper bound, whichever order `start` and `end` came in.
    pub fn bounds(&self) -> (Timestamp, Timestamp) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, ts: Timestamp) -> bool {
        let (lo, hi) = self.bounds();
        lo <= ts && ts <= hi
    }

    /// Whether `[from, to]` shares at least one instant with this period.
    pub fn overlaps(&self, from: Timestamp, to: Timestamp) -> bool {
        let (lo, hi) = self.bounds();
        from.min(to) <= hi && from.max(to) >= lo
    }

    /// Records inside the period. Records without a timestamp are excluded.
    pub fn records<'a>(&self, transcript: &'a Transcript) -> impl Iterator<Item = &'a Record> + 'a {
        let period = *self;
        transcript
            .records()
            .iter()
            .filter(move |r| r.timestamp().is_some_and(|ts| period.contains(ts)))
    }

    pub fn count_records(&self, transcript: &Transcript) -> usize {
        self.records(transcript).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_types::{parse_timestamp, SessionKey};

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    fn entry(id: &str, modified: &str) -> SessionEntry {
        SessionEntry::new(
            &SessionKey::new("claude", id),
            "jsonl",
            ts("2025-01-01T08:00:00Z"),
            ts(modified),
        )
    }

    #[test]
    fn end_is_previous_commit_when_known() {
        let p = WorkPeriod::resolve(
            ts("2025-01-01T08:00:00Z"),
            Some(ts("2025-01-01T09:00:00Z")),
            &[entry("a", "2025-01-01T11:00:00Z")],
        );
        assert_eq!(p.end, ts("2025-01-01T09:00:00Z"));
    }

    #[test]
    fn end_falls_back_to_latest_modified() {
        let p = WorkPeriod::resolve(
            ts("2025-01-01T08:00:00Z"),
            None,
            &[
                entry("a", "2025-01-01T10:00:00Z"),
                entry("b", "2025-01-01T11:30:00Z"),
                entry("c", "2025-01-01T09:00:00Z"),
            ],
        );
        assert_eq!(p.end, ts("2025-01-01T11:30:00Z"));
    }

    #[test]
    fn end_falls_back_to_start_without_sessions() {
        let start = ts("2025-01-01T08:00:00Z");
        assert_eq!(WorkPeriod::resolve(start, None, &[]).end, start);
    }

    #[test]
    fn contains_is_inclusive_and_order_insensitive() {
        let p = WorkPeriod::new(ts("2025-01-01T10:00:00Z"), ts("2025-01-01T08:00:00Z"));
        assert!(p.contains(ts("2025-01-01T08:00:00Z")));
        assert!(p.contains(ts("2025-01-01T10:00:00Z")));
        assert!(!p.contains(ts("2025-01-01T10:00:00.001Z")));
        assert!(p.overlaps(ts("2025-01-01T07:00:00Z"), ts("2025-01-01T08:00:00Z")));
        assert!(!p.overlaps(ts("2025-01-01T06:00:00Z"), ts("2025-01-01T07:00:00Z")));
    }

    #[test]
    fn windowed_view_leaves_transcript_intact() {
        let raw = concat!(
            "{\"timestamp\":\"2025-01-01T07:59:59Z\"}\n",
            "{\"timestamp\":\"2025-01-01T08:00:00Z\"}\n",
            "{\"no\":\"timestamp\"}\n",
            "{\"timestamp\":\"2025-01-01T09:00:00Z\"}\n",
        );
        let t = Transcript::parse(raw.as_bytes());
        let p = WorkPeriod::new(ts("2025-01-01T08:00:00Z"), ts("2025-01-01T09:00:00Z"));
        assert_eq!(p.count_records(&t), 2);
        assert_eq!(t.len(), 4);
        assert_eq!(t.to_bytes(), raw.as_bytes());
    }
}

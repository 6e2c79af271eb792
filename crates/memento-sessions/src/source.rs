use std::path::{Path, PathBuf};
use std::time::SystemTime;

use memento_types::{SessionKey, Timestamp, Transcript};

use crate::error::{SessionError, SessionResult};

/// A session transcript found on the local machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalSession {
    pub key: SessionKey,
    pub path: PathBuf,
    /// Extension of the stored blob (`jsonl`).
    pub ext: String,
    /// First recorded activity.
    pub created: Timestamp,
    /// Last recorded activity.
    pub modified: Timestamp,
}

/// One assistant's local session store.
pub trait SessionSource: Send + Sync {
    /// Tool name used as the top-level entry in the transcripts tree.
    fn tool(&self) -> &str;

    /// Every session recorded for the repository.
    fn list(&self) -> SessionResult<Vec<LocalSession>>;

    /// The raw transcript bytes.
    fn read(&self, session: &LocalSession) -> SessionResult<Vec<u8>> {
        std::fs::read(&session.path).map_err(|e| SessionError::io(&session.path, e))
    }
}

/// First and last activity of a transcript.
///
/// Uses record timestamps when any parse, else the file's modification time
/// for both ends.
pub fn activity_span(bytes: &[u8], path: &Path) -> SessionResult<(Timestamp, Timestamp)> {
    if let Some(span) = Transcript::parse(bytes).span() {
        return Ok(span);
    }
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| SessionError::io(path, e))?;
    let ts = Timestamp::from(mtime.max(SystemTime::UNIX_EPOCH));
    Ok((ts, ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_types::parse_timestamp;

    #[test]
    fn span_from_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        let body = b"{\"timestamp\":\"2025-01-01T10:00:00Z\"}\n{\"timestamp\":\"2025-01-01T09:00:00Z\"}\n";
        std::fs::write(&path, body).unwrap();
        let (lo, hi) = activity_span(body, &path).unwrap();
        assert_eq!(lo, parse_timestamp("2025-01-01T09:00:00Z").unwrap());
        assert_eq!(hi, parse_timestamp("2025-01-01T10:00:00Z").unwrap());
    }

    #[test]
    fn span_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(&path, b"{}\n").unwrap();
        let (lo, hi) = activity_span(b"{}\n", &path).unwrap();
        assert_eq!(lo, hi);
        assert!(lo > parse_timestamp("2020-01-01T00:00:00Z").unwrap());
    }
}

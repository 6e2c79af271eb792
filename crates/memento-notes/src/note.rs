use memento_types::{SessionKey, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NoteError, NoteResult};

/// Current note schema version.
pub const NOTE_VERSION: u32 = 1;

/// One session attached to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub tool: String,
    pub id: String,
    /// Path of the transcript blob inside the transcripts tree.
    pub path: String,
    #[serde(with = "rfc3339")]
    pub created: Timestamp,
    #[serde(with = "rfc3339")]
    pub modified: Timestamp,
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SessionEntry {
    pub fn new(
        key: &SessionKey,
        ext: &str,
        created: Timestamp,
        modified: Timestamp,
    ) -> Self {
        Self {
            tool: key.tool.clone(),
            id: key.id.clone(),
            path: Self::blob_path(key, ext),
            created,
            modified,
            removed: false,
        }
    }

    /// `tool/<id>.<ext>`
    pub fn blob_path(key: &SessionKey, ext: &str) -> String {
        format!("{}/{}.{}", key.tool, key.id, ext)
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.tool.clone(), self.id.clone())
    }

    pub fn matches(&self, key: &SessionKey) -> bool {
        self.tool == key.tool && self.id == key.id
    }

    /// File extension of the stored blob, from `path`.
    pub fn ext(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map_or(self.path.as_str(), |(_, file)| file)
            .rsplit_once('.')
            .map_or("", |(_, ext)| ext)
    }
}

/// The manifest attached to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub version: u32,
    #[serde(with = "rfc3339")]
    pub start_work: Timestamp,
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

impl Note {
    /// Build a note. Later entries for the same session replace earlier ones.
    pub fn new(start_work: Timestamp, sessions: Vec<SessionEntry>) -> Self {
        let mut note = Self {
            version: NOTE_VERSION,
            start_work,
            sessions: Vec::with_capacity(sessions.len()),
        };
        for entry in sessions {
            match note.sessions.iter_mut().find(|e| e.tool == entry.tool && e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => note.sessions.push(entry),
            }
        }
        note
    }

    /// Parse a note body.
    pub fn parse(bytes: &[u8]) -> NoteResult<Self> {
        let note: Self = serde_json::from_slice(bytes)?;
        if note.version != NOTE_VERSION {
            return Err(NoteError::UnsupportedVersion {
                found: note.version,
                expected: NOTE_VERSION,
            });
        }
        Ok(note)
    }

    /// Serialize as the note body.
    pub fn to_bytes(&self) -> NoteResult<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(self)?;
        out.push(b'\n');
        Ok(out)
    }

    /// Sessions not flagged as removed.
    pub fn active_sessions(&self) -> impl Iterator<Item = &SessionEntry> {
        self.sessions.iter().filter(|e| !e.removed)
    }

    pub fn find(&self, key: &SessionKey) -> Option<&SessionEntry> {
        self.sessions.iter().find(|e| e.matches(key))
    }

    /// Flag every entry for `key` as removed. Returns how many entries matched.
    pub fn mark_removed(&mut self, key: &SessionKey) -> usize {
        let mut matched = 0;
        for entry in self.sessions.iter_mut().filter(|e| e.matches(key)) {
            entry.removed = true;
            matched += 1;
        }
        matched
    }

    /// Merge a freshly built note into this one.
    ///
    /// Entries are keyed by `(tool, id)`. A fresh entry replaces a live one
    /// and is appended when new; a removed entry stays removed and keeps its
    /// old data. Entries not present in `fresh` are kept. `start_work` becomes
    /// the earlier of the two.
    pub fn merge(&mut self, fresh: Note) {
        self.start_work = self.start_work.min(fresh.start_work);
        for entry in fresh.sessions {
            match self.sessions.iter_mut().find(|e| e.tool == entry.tool && e.id == entry.id) {
                Some(existing) if existing.removed => {
                    debug!(tool = %entry.tool, id = %entry.id, "keeping removed session removed");
                }
                Some(existing) => *existing = entry,
                None => self.sessions.push(entry),
            }
        }
    }

    /// Latest `modified` across all entries, removed ones included.
    pub fn latest_modified(&self) -> Option<Timestamp> {
        latest_modified(&self.sessions)
    }
}

/// The latest `modified` time in `sessions`.
///
/// A candidate replaces the current best only when strictly later, so among
/// equal timestamps the first entry wins.
pub fn latest_modified(sessions: &[SessionEntry]) -> Option<Timestamp> {
    let mut best: Option<&SessionEntry> = None;
    for entry in sessions {
        if best.map_or(true, |b| entry.modified > b.modified) {
            best = Some(entry);
        }
    }
    best.map(|e| e.modified)
}

mod rfc3339 {
    use memento_types::{format_timestamp, parse_timestamp, Timestamp};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).map_err(de::Error::custom)
    }
}

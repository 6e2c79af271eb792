use std::collections::HashMap;

use memento_types::SessionKey;

use crate::error::{SessionError, SessionResult};
use crate::source::{LocalSession, SessionSource};

/// A session source backed by in-memory transcripts.
///
/// Used by tests and by callers that already hold transcript bytes.
pub struct MemorySource {
    tool: String,
    sessions: Vec<LocalSession>,
    contents: HashMap<SessionKey, Vec<u8>>,
}

impl MemorySource {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            sessions: Vec::new(),
            contents: HashMap::new(),
        }
    }

    /// Add a session. Its activity span comes from the record timestamps.
    pub fn insert(&mut self, id: &str, bytes: impl Into<Vec<u8>>) -> &LocalSession {
        let bytes = bytes.into();
        let key = SessionKey::new(self.tool.clone(), id);
        let (created, modified) = memento_types::Transcript::parse(&bytes)
            .span()
            .unwrap_or_else(|| {
                let now = chrono::Utc::now();
                (now, now)
            });
        self.sessions.retain(|s| s.key != key);
        self.sessions.push(LocalSession {
            key: key.clone(),
            path: format!("memory://{key}").into(),
            ext: "jsonl".into(),
            created,
            modified,
        });
        self.contents.insert(key, bytes);
        let last = self.sessions.len() - 1;
        &self.sessions[last]
    }
}

impl SessionSource for MemorySource {
    fn tool(&self) -> &str {
        &self.tool
    }

    fn list(&self) -> SessionResult<Vec<LocalSession>> {
        Ok(self.sessions.clone())
    }

    fn read(&self, session: &LocalSession) -> SessionResult<Vec<u8>> {
        self.contents.get(&session.key).cloned().ok_or_else(|| {
            SessionError::io(
                &session.path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "session not in memory"),
            )
        })
    }
}

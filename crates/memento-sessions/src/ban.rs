//! The local ban list: sessions that must never be captured again.

use std::path::Path;

use chrono::Utc;
use memento_types::{SessionKey, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SessionError, SessionResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedSession {
    pub id: String,
    pub tool: String,
    pub banned_at: Timestamp,
    #[serde(default)]
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanList {
    #[serde(default)]
    pub banned: Vec<BannedSession>,
}

impl BanList {
    /// Load the list at `path`. A missing file is an empty list.
    pub fn load(path: &Path) -> SessionResult<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SessionError::io(path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| SessionError::BanList {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the list to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> SessionResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }
        let mut body = serde_json::to_vec_pretty(self).map_err(|source| SessionError::BanList {
            path: path.to_path_buf(),
            source,
        })?;
        body.push(b'\n');
        std::fs::write(path, body).map_err(|e| SessionError::io(path, e))?;
        debug!(path = %path.display(), entries = self.banned.len(), "ban list saved");
        Ok(())
    }

    pub fn is_banned(&self, key: &SessionKey) -> bool {
        self.banned
            .iter()
            .any(|b| b.tool == key.tool && b.id == key.id)
    }

    /// Ban `key`. Returns `false` if it was already banned.
    pub fn ban(&mut self, key: &SessionKey, reason: impl Into<String>) -> bool {
        if self.is_banned(key) {
            return false;
        }
        self.banned.push(BannedSession {
            id: key.id.clone(),
            tool: key.tool.clone(),
            banned_at: Utc::now(),
            reason: reason.into(),
        });
        true
    }

    /// Lift bans on `id`, for one tool or all of them. Returns how many
    /// entries were removed.
    pub fn unban(&mut self, id: &str, tool: Option<&str>) -> usize {
        let before = self.banned.len();
        self.banned
            .retain(|b| !(b.id == id && tool.map_or(true, |t| t == b.tool)));
        before - self.banned.len()
    }
}

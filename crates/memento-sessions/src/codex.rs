//! Codex sessions: `~/.codex/sessions/YYYY/MM/DD/rollout-*.jsonl`.
//!
//! Codex keeps every project's sessions in one tree, so each file's
//! `session_meta` record is read to match its working directory against the
//! repository.

use std::path::{Path, PathBuf};

use memento_types::{SessionKey, Transcript};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SessionError, SessionResult};
use crate::source::{activity_span, LocalSession, SessionSource};

pub const TOOL: &str = "codex";

pub struct CodexSource {
    sessions_dir: PathBuf,
    repo_root: PathBuf,
}

/// Identity fields of a rollout file.
struct SessionMeta {
    id: Option<String>,
    cwd: Option<PathBuf>,
}

impl CodexSource {
    pub fn new(sessions_dir: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            repo_root: repo_root.into(),
        }
    }

    /// `~/.codex/sessions`
    pub fn default_sessions_dir() -> SessionResult<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".codex").join("sessions"))
            .ok_or(SessionError::NoHomeDir)
    }

    fn belongs_to_repo(&self, cwd: &Path) -> bool {
        cwd.starts_with(&self.repo_root)
    }
}

fn session_meta(transcript: &Transcript) -> Option<SessionMeta> {
    let payload = transcript
        .records()
        .iter()
        .find(|r| r.kind() == Some("session_meta"))?
        .value()?
        .get("payload")?;
    Some(SessionMeta {
        id: payload.get("id").and_then(|v| v.as_str()).map(str::to_string),
        cwd: payload.get("cwd").and_then(|v| v.as_str()).map(PathBuf::from),
    })
}

/// `rollout-2025-01-01T10-00-00-<uuid>.jsonl` -> the file stem minus `rollout-`.
fn id_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_prefix("rollout-").unwrap_or(stem).to_string())
}

impl SessionSource for CodexSource {
    fn tool(&self) -> &str {
        TOOL
    }

    fn list(&self) -> SessionResult<Vec<LocalSession>> {
        if !self.sessions_dir.is_dir() {
            debug!(dir = %self.sessions_dir.display(), "no codex sessions directory");
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in WalkDir::new(&self.sessions_dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable codex directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let is_rollout = entry.file_type().is_file()
                && path.extension().and_then(|e| e.to_str()) == Some("jsonl")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("rollout-"));
            if !is_rollout {
                continue;
            }
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable session file");
                    continue;
                }
            };
            let transcript = Transcript::parse(&bytes);
            let Some(meta) = session_meta(&transcript) else {
                debug!(path = %path.display(), "rollout without session_meta");
                continue;
            };
            if !meta.cwd.as_deref().is_some_and(|cwd| self.belongs_to_repo(cwd)) {
                continue;
            }
            let Some(id) = meta.id.or_else(|| id_from_file_name(path)) else {
                continue;
            };
            let (created, modified) = activity_span(&bytes, path)?;
            sessions.push(LocalSession {
                key: SessionKey::new(TOOL, id),
                path: path.to_path_buf(),
                ext: "jsonl".into(),
                created,
                modified,
            });
        }
        sessions.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.key.cmp(&b.key)));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rollout(cwd: &str, id: &str, ts: &str) -> String {
        format!(
            "{{\"timestamp\":\"{ts}\",\"type\":\"session_meta\",\"payload\":{{\"id\":\"{id}\",\"cwd\":\"{cwd}\"}}}}\n\
             {{\"timestamp\":\"{ts}\",\"type\":\"response_item\",\"payload\":{{\"type\":\"message\"}}}}\n"
        )
    }

    #[test]
    fn filters_rollouts_by_working_directory() {
        let root = tempfile::tempdir().unwrap();
        let day = root.path().join("2025/01/01");
        std::fs::create_dir_all(&day).unwrap();
        std::fs::write(
            day.join("rollout-2025-01-01T10-00-00-aaa.jsonl"),
            rollout("/work/app/sub", "aaa", "2025-01-01T10:00:00Z"),
        )
        .unwrap();
        std::fs::write(
            day.join("rollout-2025-01-01T11-00-00-bbb.jsonl"),
            rollout("/work/other", "bbb", "2025-01-01T11:00:00Z"),
        )
        .unwrap();
        std::fs::write(day.join("history.jsonl"), "{}\n").unwrap();

        let sessions = CodexSource::new(root.path(), "/work/app").list().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].key, SessionKey::new("codex", "aaa"));
    }

    #[test]
    fn file_name_id_fallback() {
        assert_eq!(
            id_from_file_name(Path::new("rollout-2025-x.jsonl")).as_deref(),
            Some("2025-x")
        );
    }
}

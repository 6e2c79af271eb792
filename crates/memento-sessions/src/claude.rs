//! Claude Code sessions: `~/.claude/projects/<encoded repo path>/<id>.jsonl`.

use std::path::{Path, PathBuf};

use memento_types::SessionKey;
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};
use crate::source::{activity_span, LocalSession, SessionSource};

pub const TOOL: &str = "claude";

pub struct ClaudeSource {
    projects_dir: PathBuf,
    repo_root: PathBuf,
}

impl ClaudeSource {
    pub fn new(projects_dir: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            repo_root: repo_root.into(),
        }
    }

    /// `~/.claude/projects`
    pub fn default_projects_dir() -> SessionResult<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".claude").join("projects"))
            .ok_or(SessionError::NoHomeDir)
    }

    /// Directory holding this repository's sessions.
    pub fn project_dir(&self) -> PathBuf {
        self.projects_dir.join(encode_project_path(&self.repo_root))
    }
}

/// Claude Code names a project directory after its absolute path with every
/// character outside `[A-Za-z0-9-]` replaced by `-`.
pub fn encode_project_path(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

impl SessionSource for ClaudeSource {
    fn tool(&self) -> &str {
        TOOL
    }

    fn list(&self) -> SessionResult<Vec<LocalSession>> {
        let dir = self.project_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "no claude project directory");
                return Ok(Vec::new());
            }
            Err(e) => return Err(SessionError::io(&dir, e)),
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SessionError::io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable session file");
                    continue;
                }
            };
            let (created, modified) = activity_span(&bytes, &path)?;
            sessions.push(LocalSession {
                key: SessionKey::new(TOOL, id),
                path: path.clone(),
                ext: "jsonl".into(),
                created,
                modified,
            });
        }
        sessions.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.key.cmp(&b.key)));
        Ok(sessions)
    }
}

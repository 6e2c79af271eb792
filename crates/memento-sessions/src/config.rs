use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::claude::{self, ClaudeSource};
use crate::codex::{self, CodexSource};
use crate::error::{SessionError, SessionResult};
use crate::source::SessionSource;

/// Where to look for local sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Enabled tools, by name.
    pub tools: Vec<String>,
    /// Overrides `~/.claude/projects`.
    pub claude_projects_dir: Option<PathBuf>,
    /// Overrides `~/.codex/sessions`.
    pub codex_sessions_dir: Option<PathBuf>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            tools: vec![claude::TOOL.into(), codex::TOOL.into()],
            claude_projects_dir: None,
            codex_sessions_dir: None,
        }
    }
}

impl SessionsConfig {
    /// Build a source for every enabled tool.
    pub fn sources(&self, repo_root: &Path) -> SessionResult<Vec<Box<dyn SessionSource>>> {
        let mut sources: Vec<Box<dyn SessionSource>> = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            match tool.as_str() {
                claude::TOOL => {
                    let dir = match &self.claude_projects_dir {
                        Some(dir) => dir.clone(),
                        None => ClaudeSource::default_projects_dir()?,
                    };
                    sources.push(Box::new(ClaudeSource::new(dir, repo_root)));
                }
                codex::TOOL => {
                    let dir = match &self.codex_sessions_dir {
                        Some(dir) => dir.clone(),
                        None => CodexSource::default_sessions_dir()?,
                    };
                    sources.push(Box::new(CodexSource::new(dir, repo_root)));
                }
                other => return Err(SessionError::UnknownTool(other.to_string())),
            }
        }
        Ok(sources)
    }
}

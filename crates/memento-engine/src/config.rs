use std::path::{Path, PathBuf};

use memento_scrub::ScrubConfig;
use memento_sessions::SessionsConfig;
use memento_store::validate_ref_name;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Per-repository config file, at the working tree root.
pub const CONFIG_FILE: &str = ".memento.toml";

/// Engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MementoConfig {
    pub refs: RefsConfig,
    pub scrub: ScrubConfig,
    pub sessions: SessionsConfig,
    pub redact: RedactConfig,
}

/// Where notes and transcripts live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefsConfig {
    pub notes: String,
    pub transcripts: String,
    /// Remote consulted before destructive rewrites.
    pub remote: String,
}

impl Default for RefsConfig {
    fn default() -> Self {
        Self {
            notes: "refs/notes/memento".into(),
            transcripts: "refs/memento/transcripts".into(),
            remote: "origin".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactConfig {
    /// How far a record's timestamp may be from the requested one.
    pub tolerance_ms: i64,
    pub placeholder: String,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 1000,
            placeholder: memento_scrub::config::DEFAULT_PLACEHOLDER.into(),
        }
    }
}

impl MementoConfig {
    /// Parse TOML and validate.
    pub fn from_toml(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loading config");
                Self::from_toml(&text)
                    .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(EngineError::Config(format!("{}: {e}", path.display()))),
        }
    }

    /// Load `<repo_root>/.memento.toml`.
    pub fn load_for_repo(repo_root: &Path) -> EngineResult<Self> {
        Self::load(&repo_root.join(CONFIG_FILE))
    }

    /// The ban list location inside a git directory.
    pub fn ban_list_path(git_dir: &Path) -> PathBuf {
        git_dir.join("memento").join("banned.json")
    }

    pub fn validate(&self) -> EngineResult<()> {
        for name in [&self.refs.notes, &self.refs.transcripts] {
            validate_ref_name(name).map_err(|e| EngineError::Config(e.to_string()))?;
        }
        if self.refs.notes == self.refs.transcripts {
            return Err(EngineError::Config(
                "notes and transcripts refs must differ".into(),
            ));
        }
        if self.redact.tolerance_ms < 0 {
            return Err(EngineError::Config("redact.tolerance_ms must not be negative".into()));
        }
        Ok(())
    }
}

use std::path::PathBuf;

/// Errors from reading local session data.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ban list {path}: {source}")]
    BanList {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot locate home directory")]
    NoHomeDir,

    #[error("unknown session tool '{0}'")]
    UnknownTool(String),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

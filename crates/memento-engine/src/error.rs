use memento_notes::NoteError;
use memento_scrub::ScrubError;
use memento_sessions::SessionError;
use memento_store::StoreError;
use thiserror::Error;

/// Coarse error classes reported to operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// A commit, range, or session reference could not be resolved.
    Resolution,
    /// Reading or writing the store or local files failed.
    Store,
    /// A note, config, or pattern could not be parsed.
    Parse,
    /// The requested record or session does not exist.
    NotFound,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot resolve '{rev}': {source}")]
    Resolution {
        rev: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("note error: {0}")]
    Note(#[from] NoteError),

    #[error("scrub error: {0}")]
    Scrub(#[from] ScrubError),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Resolution { .. } | Self::InvalidTarget(_) => ErrorClass::Resolution,
            Self::Store(StoreError::UnknownRevision(_)) => ErrorClass::Resolution,
            Self::Store(_) | Self::Session(_) => ErrorClass::Store,
            Self::Note(_) | Self::Scrub(_) | Self::Config(_) => ErrorClass::Parse,
            Self::NotFound(_) => ErrorClass::NotFound,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

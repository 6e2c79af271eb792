/// Errors from reading or writing notes.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// The note body is not a valid note document.
    #[error("malformed note: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The note was written by an incompatible version.
    #[error("unsupported note version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

pub type NoteResult<T> = Result<T, NoteError>;

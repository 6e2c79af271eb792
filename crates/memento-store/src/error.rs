use memento_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// A revision or range could not be resolved to commits.
    #[error("cannot resolve revision '{0}'")]
    UnknownRevision(String),

    /// The object exists but is not of the expected kind.
    #[error("object {id} is a {actual}, expected {expected}")]
    WrongKind {
        id: ObjectId,
        expected: String,
        actual: String,
    },

    /// Compare-and-set ref update lost a race.
    #[error("ref {name} moved: expected {expected}, found {actual}")]
    RefConflict {
        name: String,
        expected: String,
        actual: String,
    },

    /// The ref name is not acceptable to the store.
    #[error("invalid ref name {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// The backend command failed.
    #[error("backend command failed: {command}: {stderr}")]
    Backend { command: String, stderr: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

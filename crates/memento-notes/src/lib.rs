//! Notes: the per-commit manifest of attached sessions.
//!
//! A [`Note`] is a small JSON document attached to one commit. It lists the
//! sessions relevant to that commit and when work on it began. Entries are
//! never deleted; removing a session flips its `removed` flag so the note
//! keeps an auditable history of what was once attached.

pub mod error;
pub mod note;
pub mod period;

pub use error::{NoteError, NoteResult};
pub use note::{latest_modified, Note, SessionEntry, NOTE_VERSION};
pub use period::WorkPeriod;

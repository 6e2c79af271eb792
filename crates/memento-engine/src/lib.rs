//! The memento lifecycle engine.
//!
//! Composes the store, scrub pipeline, notes, and session discovery into the
//! user-facing operations: add, repair, remove, redact, ban, unban, and show.
//! Every operation returns an explicit [`Outcome`] per commit; range
//! operations tally them in a [`BatchReport`] and never abort on one
//! commit's failure.

pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod redact;
pub mod tree;

pub use config::{MementoConfig, RedactConfig, RefsConfig, CONFIG_FILE};
pub use engine::{CaptureOptions, Memento, RemoveOptions, RemoveReport, ShowReport, ShownSession};
pub use error::{EngineError, EngineResult, ErrorClass};
pub use outcome::{BatchReport, CommitOutcome, Outcome};
pub use redact::RedactTarget;
pub use tree::{session_ext, BlobUpdate, TranscriptTree};

pub use memento_notes::{Note, SessionEntry, WorkPeriod};
pub use memento_scrub::ScrubConfig;
pub use memento_sessions::{BanList, Discovery, SessionsConfig};
pub use memento_store::{GitStore, InMemoryStore, ObjectStore};
pub use memento_types::{ObjectId, SessionKey, Timestamp};

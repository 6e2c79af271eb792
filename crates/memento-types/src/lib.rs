//! Foundation types for memento.
//!
//! Every other memento crate depends on `memento-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (git SHA-1, SHA-256, or BLAKE3)
//! - [`Timestamp`]: UTC instant used for commits, sessions, and records
//! - [`SessionKey`]: `(tool, id)` pair naming one captured session
//! - [`Transcript`]: JSONL transcript as an ordered list of [`Record`]s

pub mod error;
pub mod object;
pub mod session;
pub mod temporal;
pub mod transcript;

pub use error::TypeError;
pub use object::ObjectId;
pub use session::SessionKey;
pub use temporal::{format_timestamp, parse_timestamp, Timestamp};
pub use transcript::{Record, Transcript};

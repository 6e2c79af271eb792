//! Object store adapter for memento.
//!
//! The engine never talks to git directly. Everything it persists goes
//! through the [`ObjectStore`] trait: content-addressed blobs, trees of named
//! entries, refs with compare-and-set updates, notes attached to commits, and
//! read-only commit metadata.
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- `HashMap`-based store for tests and embedding, with
//!   scripted commits
//! - [`GitStore`] -- drives the `git` CLI against a real repository
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Write-then-link: write every object first, then move a ref.
//! 3. A ref update is the only durability point; it either lands whole or not
//!    at all.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod git;
pub mod hasher;
pub mod memory;
pub mod names;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use git::GitStore;
pub use hasher::ContentHasher;
pub use memory::InMemoryStore;
pub use names::validate_ref_name;
pub use object::{CommitInfo, EntryMode, ObjectKind, Tree, TreeEntry};
pub use traits::ObjectStore;

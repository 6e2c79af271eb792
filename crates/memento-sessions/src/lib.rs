//! Session discovery.
//!
//! Assistants write their transcripts to local files this crate reads but
//! does not own. A [`SessionSource`] lists one tool's sessions for a
//! repository; [`Discovery`] combines sources, keeps the sessions active
//! during a work period, and drops any on the [`BanList`].

pub mod ban;
pub mod claude;
pub mod codex;
pub mod config;
pub mod discovery;
pub mod error;
pub mod memory;
pub mod source;

pub use ban::{BanList, BannedSession};
pub use claude::ClaudeSource;
pub use codex::CodexSource;
pub use config::SessionsConfig;
pub use discovery::Discovery;
pub use error::{SessionError, SessionResult};
pub use memory::MemorySource;
pub use source::{activity_span, LocalSession, SessionSource};

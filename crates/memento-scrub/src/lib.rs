//! Privacy scrubbing for memento transcripts.
//!
//! Every transcript passes through the [`ScrubPipeline`] before it is hashed
//! into the store. The default pipeline runs three stages in order:
//!
//! 1. [`NodeRemovalStage`] drops duplicated fields so later stages scan less.
//! 2. [`ToolOutputStage`] blanks the results of configured tools, correlating
//!    each result with its invocation by id across the whole transcript.
//! 3. [`PatternStage`] rewrites secrets and PII in every string leaf.
//!
//! No stage changes a record's shape: keys and value types survive, so
//! downstream JSON consumers keep working on scrubbed transcripts.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod visitor;

pub use config::{FieldRule, PatternRule, ScrubConfig, ToolCallShape};
pub use error::{ScrubError, ScrubResult};
pub use pipeline::{ScrubPipeline, ScrubReport};
pub use stage::{ScrubStage, StageReport};
pub use stages::{blank_value, NodeRemovalStage, PatternStage, Recognizer, ToolOutputStage};

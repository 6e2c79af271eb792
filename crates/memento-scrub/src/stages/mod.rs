//! Built-in scrub stages, in pipeline order.

pub mod node_removal;
pub mod patterns;
pub mod tool_output;

pub use node_removal::NodeRemovalStage;
pub use patterns::{PatternStage, Recognizer};
pub use tool_output::{blank_value, ToolOutputStage};

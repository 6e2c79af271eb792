use serde::{Deserialize, Serialize};

/// Placeholder written over redacted content.
pub const DEFAULT_PLACEHOLDER: &str = "[REDACTED]";

/// Configuration for the scrub pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// When `false` the pipeline is a pass-through of the raw bytes.
    pub enabled: bool,
    /// Duplicate fields dropped by the node removal stage.
    pub duplicate_fields: Vec<FieldRule>,
    /// Tool names whose results are blanked.
    pub redact_tools: Vec<String>,
    /// Text written over blanked tool results.
    pub placeholder: String,
    /// How tool invocations and results are recorded by each assistant.
    pub shapes: Vec<ToolCallShape>,
    /// Extra recognizers, applied before the built-in ones.
    pub patterns: Vec<PatternRule>,
    /// Whether the built-in recognizers run at all.
    pub builtin_patterns: bool,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duplicate_fields: vec![FieldRule {
                field: "toolUseResult".into(),
                keep_if_any_key: vec!["answers".into(), "plan".into()],
            }],
            redact_tools: vec!["Read".into(), "read_file".into()],
            placeholder: DEFAULT_PLACEHOLDER.into(),
            shapes: vec![ToolCallShape::claude(), ToolCallShape::codex()],
            patterns: Vec::new(),
            builtin_patterns: true,
        }
    }
}

impl ScrubConfig {
    /// A configuration that leaves transcripts untouched.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// A top-level record field to drop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    /// Keep the field when its value is an object carrying any of these keys.
    #[serde(default)]
    pub keep_if_any_key: Vec<String>,
}

impl FieldRule {
    /// Whether `value` must be kept despite being a duplicate.
    pub fn keeps(&self, value: &serde_json::Value) -> bool {
        value
            .as_object()
            .is_some_and(|obj| self.keep_if_any_key.iter().any(|k| obj.contains_key(k)))
    }
}

/// The JSON layout of a tool invocation and its result.
///
/// Both sides are objects found anywhere in a record, identified by their
/// `type` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallShape {
    pub call_type: String,
    pub call_name_key: String,
    pub call_id_key: String,
    pub result_type: String,
    pub result_id_key: String,
    pub result_content_key: String,
}

impl ToolCallShape {
    /// Claude Code: `tool_use` / `tool_result` content blocks.
    pub fn claude() -> Self {
        Self {
            call_type: "tool_use".into(),
            call_name_key: "name".into(),
            call_id_key: "id".into(),
            result_type: "tool_result".into(),
            result_id_key: "tool_use_id".into(),
            result_content_key: "content".into(),
        }
    }

    /// Codex: `function_call` / `function_call_output` payloads.
    pub fn codex() -> Self {
        Self {
            call_type: "function_call".into(),
            call_name_key: "name".into(),
            call_id_key: "call_id".into(),
            result_type: "function_call_output".into(),
            result_id_key: "call_id".into(),
            result_content_key: "output".into(),
        }
    }
}

/// A user-supplied recognizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub regex: String,
    /// Replacement text; `$1`-style group references are expanded.
    #[serde(default = "default_replacement")]
    pub replacement: String,
}

fn default_replacement() -> String {
    DEFAULT_PLACEHOLDER.into()
}

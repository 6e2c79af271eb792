//! Tool-output redaction.
//!
//! A tool invocation and its result live in different records, linked by an
//! opaque id, and the result may arrive many records later. The stage first
//! indexes every invocation of a redacted tool across the whole transcript,
//! then rewrites the results whose id is in that index. The index is never
//! modified while results are rewritten.

use std::collections::HashMap;

use memento_types::Transcript;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::ToolCallShape;
use crate::stage::{ScrubStage, StageReport};
use crate::visitor::{walk, walk_objects, Visitor};

/// Blanks the results of configured tools.
pub struct ToolOutputStage {
    tools: Vec<String>,
    shapes: Vec<ToolCallShape>,
    placeholder: String,
}

/// Result id to the shape whose content key it must blank.
type Index<'a> = HashMap<String, &'a ToolCallShape>;

impl ToolOutputStage {
    pub fn new(tools: Vec<String>, shapes: Vec<ToolCallShape>, placeholder: String) -> Self {
        Self {
            tools,
            shapes,
            placeholder,
        }
    }

    fn index(&self, transcript: &Transcript) -> Index<'_> {
        let mut index = Index::new();
        for value in transcript.records().iter().filter_map(|r| r.value()) {
            walk_objects(value, &mut |obj| {
                for shape in &self.shapes {
                    if str_field(obj, "type") != Some(shape.call_type.as_str()) {
                        continue;
                    }
                    let Some(name) = str_field(obj, &shape.call_name_key) else {
                        continue;
                    };
                    if !self.tools.iter().any(|t| t == name) {
                        continue;
                    }
                    if let Some(id) = str_field(obj, &shape.call_id_key) {
                        index.insert(id.to_string(), shape);
                    }
                }
            });
        }
        index
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

struct Blank<'a> {
    index: &'a Index<'a>,
    shapes: &'a [ToolCallShape],
    placeholder: &'a str,
    blanked: usize,
}

impl Visitor for Blank<'_> {
    fn visit_object(&mut self, obj: &mut Map<String, Value>) -> bool {
        let Some(kind) = str_field(obj, "type") else {
            return false;
        };
        let Some(shape) = self.shapes.iter().find(|s| s.result_type == kind) else {
            return false;
        };
        let correlated = str_field(obj, &shape.result_id_key)
            .and_then(|id| self.index.get(id))
            .is_some_and(|s| s.result_type == shape.result_type);
        if !correlated {
            return false;
        }
        let Some(content) = obj.get_mut(&shape.result_content_key) else {
            return false;
        };
        let replacement = blank_value(content, self.placeholder);
        if *content == replacement {
            return false;
        }
        *content = replacement;
        self.blanked += 1;
        true
    }
}

/// The placeholder in the same JSON type as `content`.
///
/// Strings become the placeholder, arrays a single text block, and objects
/// keep their keys with every value blanked. Other scalars are kept.
pub fn blank_value(content: &Value, placeholder: &str) -> Value {
    match content {
        Value::Array(_) => json!([{ "type": "text", "text": placeholder }]),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), blank_value(v, placeholder)))
                .collect(),
        ),
        Value::String(_) => Value::String(placeholder.to_string()),
        Value::Null | Value::Bool(_) | Value::Number(_) => content.clone(),
    }
}

impl ScrubStage for ToolOutputStage {
    fn name(&self) -> &str {
        "tool_output"
    }

    fn apply(&self, transcript: &mut Transcript) -> StageReport {
        let mut report = StageReport {
            stage: self.name().into(),
            ..Default::default()
        };
        if self.tools.is_empty() {
            return report;
        }
        let index = self.index(transcript);
        if index.is_empty() {
            return report;
        }
        debug!(invocations = index.len(), "indexed redacted tool invocations");
        let mut blank = Blank {
            index: &index,
            shapes: &self.shapes,
            placeholder: &self.placeholder,
            blanked: 0,
        };
        for record in transcript.records_mut() {
            if record.update(|v| walk(v, &mut blank)) {
                report.records_changed += 1;
            }
        }
        report.replacements = blank.blanked;
        report
    }
}

use memento_types::Transcript;
use serde_json::Value;

use crate::config::FieldRule;
use crate::stage::{ScrubStage, StageReport};

/// Drops configured duplicate fields from the top level of each record.
pub struct NodeRemovalStage {
    rules: Vec<FieldRule>,
}

impl NodeRemovalStage {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    fn strip(&self, value: &mut Value) -> usize {
        let Some(obj) = value.as_object_mut() else {
            return 0;
        };
        let mut removed = 0;
        for rule in &self.rules {
            let drop = obj.get(&rule.field).is_some_and(|v| !rule.keeps(v));
            if drop {
                obj.shift_remove(&rule.field);
                removed += 1;
            }
        }
        removed
    }
}

impl ScrubStage for NodeRemovalStage {
    fn name(&self) -> &str {
        "node_removal"
    }

    fn apply(&self, transcript: &mut Transcript) -> StageReport {
        let mut report = StageReport {
            stage: self.name().into(),
            ..Default::default()
        };
        for record in transcript.records_mut() {
            let mut removed = 0;
            if record.update(|v| {
                removed = self.strip(v);
                removed > 0
            }) {
                report.records_changed += 1;
                report.replacements += removed;
            }
        }
        report
    }
}

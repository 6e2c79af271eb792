use memento_types::Transcript;
use tracing::debug;

use crate::config::ScrubConfig;
use crate::error::ScrubResult;
use crate::stage::{ScrubStage, StageReport};
use crate::stages::{NodeRemovalStage, PatternStage, ToolOutputStage};

// ---------------------------------------------------------------------------
// ScrubReport
// ---------------------------------------------------------------------------

/// Per-stage results of one scrub run, in stage order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrubReport {
    pub stages: Vec<StageReport>,
}

impl ScrubReport {
    /// Total rewrites across all stages.
    pub fn replacements(&self) -> usize {
        self.stages.iter().map(|s| s.replacements).sum()
    }

    /// Returns `true` if no stage changed anything.
    pub fn is_clean(&self) -> bool {
        self.replacements() == 0
    }
}

// ---------------------------------------------------------------------------
// ScrubPipeline
// ---------------------------------------------------------------------------

/// An ordered list of stages every transcript passes through before it is
/// stored.
pub struct ScrubPipeline {
    stages: Vec<Box<dyn ScrubStage>>,
    enabled: bool,
}

impl ScrubPipeline {
    /// An empty, enabled pipeline.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            enabled: true,
        }
    }

    /// A pipeline that passes input through unchanged.
    pub fn disabled() -> Self {
        Self {
            stages: Vec::new(),
            enabled: false,
        }
    }

    /// The standard pipeline:
    /// NodeRemoval -> ToolOutput -> Patterns
    pub fn from_config(config: &ScrubConfig) -> ScrubResult<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let mut pipeline = Self::new();
        pipeline.add_stage(Box::new(NodeRemovalStage::new(
            config.duplicate_fields.clone(),
        )));
        pipeline.add_stage(Box::new(ToolOutputStage::new(
            config.redact_tools.clone(),
            config.shapes.clone(),
            config.placeholder.clone(),
        )));
        pipeline.add_stage(Box::new(PatternStage::from_config(config)?));
        Ok(pipeline)
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn ScrubStage>) {
        self.stages.push(stage);
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run every stage over `transcript` in order.
    pub fn scrub(&self, transcript: &mut Transcript) -> ScrubReport {
        let mut report = ScrubReport::default();
        if !self.enabled {
            return report;
        }
        for stage in &self.stages {
            let result = stage.apply(transcript);
            debug!(
                stage = %result.stage,
                records = result.records_changed,
                replacements = result.replacements,
                "scrub stage complete"
            );
            report.stages.push(result);
        }
        report
    }

    /// Scrub raw JSONL bytes. A disabled pipeline returns them verbatim.
    pub fn scrub_bytes(&self, raw: &[u8]) -> (Vec<u8>, ScrubReport) {
        if !self.enabled {
            return (raw.to_vec(), ScrubReport::default());
        }
        let mut transcript = Transcript::parse(raw);
        let report = self.scrub(&mut transcript);
        (transcript.to_bytes(), report)
    }
}

impl Default for ScrubPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScrubPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("ScrubPipeline")
            .field("stages", &names)
            .field("enabled", &self.enabled)
            .finish()
    }
}

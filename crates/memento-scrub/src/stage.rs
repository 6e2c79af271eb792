use memento_types::Transcript;

/// What a stage did to a transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    /// Records the stage rewrote.
    pub records_changed: usize,
    /// Individual rewrites (fields dropped, results blanked, matches masked).
    pub replacements: usize,
}

/// One step of the scrub pipeline.
///
/// Stages see the whole transcript at once because some of them need to
/// correlate records (a tool result can appear many records after its
/// invocation). Stages must only rewrite parsed records and must preserve
/// record shape.
pub trait ScrubStage: Send + Sync {
    /// Short name used in reports and logs.
    fn name(&self) -> &str;

    fn apply(&self, transcript: &mut Transcript) -> StageReport;
}

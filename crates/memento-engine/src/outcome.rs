use std::fmt;

use memento_types::ObjectId;

use crate::error::EngineError;

/// Result of one lifecycle operation on one commit.
#[derive(Debug)]
pub enum Outcome {
    /// The transition happened.
    Applied(String),
    /// A policy decided not to act. Not an error.
    Skipped(String),
    /// A hard error for this commit only.
    Failed(EngineError),
}

impl Outcome {
    pub fn applied(reason: impl Into<String>) -> Self {
        Self::Applied(reason.into())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Fold a fallible operation into an outcome.
    pub fn from_result(result: Result<Outcome, EngineError>) -> Self {
        result.unwrap_or_else(Self::Failed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied(reason) => write!(f, "applied: {reason}"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct CommitOutcome {
    pub commit: ObjectId,
    pub outcome: Outcome,
}

/// Tally of a range operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub per_commit: Vec<CommitOutcome>,
}

impl BatchReport {
    pub fn record(&mut self, commit: ObjectId, outcome: Outcome) {
        match &outcome {
            Outcome::Applied(_) => self.applied += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
        self.per_commit.push(CommitOutcome { commit, outcome });
    }

    pub fn total(&self) -> usize {
        self.per_commit.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} skipped, {} failed",
            self.applied, self.skipped, self.failed
        )
    }
}

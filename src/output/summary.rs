//! Per-run summary of outcomes

use crate::state::{Outcome, OutcomeKind, Severity};
use std::collections::HashMap;
use std::fmt;

/// Outcome counts for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Number of records that reached a terminal state
    pub total: usize,

    /// Count per outcome kind (kinds that never occurred are absent)
    pub by_kind: HashMap<OutcomeKind, usize>,

    /// Records whose image was re-encoded
    pub converted: usize,

    /// Records whose conversion failed and fell back to the original file
    pub fallbacks: usize,
}

impl ScanSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            *summary.by_kind.entry(outcome.kind).or_insert(0) += 1;

            if outcome.notes.iter().any(|n| n.severity == Severity::Warning) {
                summary.fallbacks += 1;
            } else if outcome.notes.iter().any(|n| n.severity == Severity::Info) {
                summary.converted += 1;
            }
        }

        summary
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn succeeded(&self) -> usize {
        self.count(OutcomeKind::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeKind::SkippedAlreadySet) + self.count(OutcomeKind::SkippedNoImageFound)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeKind::FailedFetch)
            + self.count(OutcomeKind::FailedLocalSave)
            + self.count(OutcomeKind::FailedUpload)
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} records: {} succeeded, {} skipped, {} failed ({} converted, {} uploaded unconverted).",
            self.total,
            self.succeeded(),
            self.skipped(),
            self.failed(),
            self.converted,
            self.fallbacks
        )
    }
}

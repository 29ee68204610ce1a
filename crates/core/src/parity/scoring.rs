use crate::model::{Finding, ParityStatus, Severity};

/// Reduce findings to a status by strict severity dominance.
///
/// Any red finding makes the result red; otherwise any yellow finding makes it
/// yellow; info-only or empty lists are green.
pub fn score(findings: &[Finding]) -> ParityStatus {
    if findings.iter().any(|f| f.level == Severity::Red) {
        ParityStatus::Red
    } else if findings.iter().any(|f| f.level == Severity::Yellow) {
        ParityStatus::Yellow
    } else {
        ParityStatus::Green
    }
}

/// Per-status tallies over a batch of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl StatusCounts {
    pub fn tally<I: IntoIterator<Item = ParityStatus>>(statuses: I) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                ParityStatus::Green => counts.green += 1,
                ParityStatus::Yellow => counts.yellow += 1,
                ParityStatus::Red => counts.red += 1,
            }
        }
        counts
    }
}

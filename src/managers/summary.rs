//! Run-level aggregation and outcome classification

use crate::targets::BackupResult;
use serde::Serialize;
use std::fmt;

/// Classification of a run from its per-target results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

impl Outcome {
    /// `None` when there are no results to classify
    pub fn classify(succeeded: usize, failed: usize) -> Option<Self> {
        match (succeeded, failed) {
            (0, 0) => None,
            (_, 0) => Some(Outcome::AllSucceeded),
            (0, _) => Some(Outcome::AllFailed),
            _ => Some(Outcome::PartialFailure),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::AllSucceeded => "all succeeded",
            Outcome::PartialFailure => "partial failure",
            Outcome::AllFailed => "all failed",
        };
        f.write_str(s)
    }
}

/// Results of one invocation, in configuration order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub results: Vec<BackupResult>,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn new(results: Vec<BackupResult>, dry_run: bool) -> Self {
        Self { results, dry_run }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.results.iter().map(|r| r.size_bytes).sum()
    }

    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes() as f64 / (1024.0 * 1024.0)
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.results.iter().map(|r| r.duration_seconds()).sum()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::classify(self.succeeded(), self.failed())
    }

    /// True only when at least one target ran and none failed
    pub fn process_exit_ok(&self) -> bool {
        self.total() > 0 && self.failed() == 0
    }
}

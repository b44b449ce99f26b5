//! Per-item outcomes and the run summary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::WorkItem;

/// Result of one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success { path: PathBuf },
    Failure { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// An outcome attributed to the item that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub index: usize,
    pub payload: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ItemOutcome {
    pub fn new(item: &WorkItem, outcome: Outcome) -> Self {
        Self {
            index: item.index,
            payload: item.payload.clone(),
            outcome,
        }
    }
}

/// Aggregate counts over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ItemOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.outcome.is_success()).count();
        Self {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Everything a finished run produced, in index order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub outcomes: Vec<ItemOutcome>,
}

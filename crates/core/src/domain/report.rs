use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::ProductId;
use crate::domain::rates::RateSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Updated,
    Skipped,
    Failed,
}

/// Error category preserved into the report so a reader can tell data
/// problems from remote-write problems without digging through logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    InvalidAttribute,
    UnknownMaterialKind,
    NoStonePriceFound,
    RemoteWrite,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Per-product result of a bulk update run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub product_id: ProductId,
    pub handle: String,
    pub title: String,
    pub old_price: Decimal,
    pub new_price: Option<Decimal>,
    pub compare_at: Option<Decimal>,
    pub status: OutcomeStatus,
    pub failure: Option<OutcomeFailure>,
}

impl UpdateOutcome {
    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Aggregated result of one orchestrator run: every per-product outcome in
/// processing order, plus the snapshot the whole run was priced against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub snapshot: RateSnapshot,
    pub outcomes: Vec<UpdateOutcome>,
}

impl RunReport {
    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts::default();
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Updated => counts.updated += 1,
                OutcomeStatus::Skipped => counts.skipped += 1,
                OutcomeStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = &UpdateOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failed())
    }
}

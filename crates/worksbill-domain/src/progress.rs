//! Progress reporting structures.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Progress of a single BOQ item.
pub struct ItemProgress {
    pub boq_item_id: Uuid,
    pub code: String,
    pub sanctioned_quantity: Decimal,
    pub verified_quantity: Decimal,
    pub sanctioned_value: Decimal,
    pub verified_value: Decimal,
    /// Quantity-based completion, capped at 100.
    pub percentage: Decimal,
    pub overrun: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Value-weighted completion of a project.
pub struct ProgressReport {
    pub project_id: Uuid,
    pub percentage: Decimal,
    pub items: Vec<ItemProgress>,
}

impl ProgressReport {
    pub fn overrun_items(&self) -> impl Iterator<Item = &ItemProgress> {
        self.items.iter().filter(|item| item.overrun)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Actual versus schedule-expected progress; a negative variance means behind schedule.
pub struct ScheduleVariance {
    pub project_id: Uuid,
    pub as_of: NaiveDate,
    pub actual: Decimal,
    pub expected: Decimal,
    pub variance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Point-in-time progress recorded when an execution is verified.
pub struct ProgressSnapshot {
    pub sequence: u64,
    pub project_id: Uuid,
    pub execution_id: Uuid,
    pub boq_item_id: Uuid,
    pub percentage: Decimal,
    pub recorded_at: DateTime<Utc>,
}

//! Project completion, schedule variance and the append-only progress history.

use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use worksbill_domain::{
    BoqItem, ItemProgress, Milestone, ProgressReport, ProgressSnapshot, ScheduleVariance,
};

use crate::{
    money::{ratio_percent, round2, HUNDRED},
    CoreError,
};

/// Pure progress arithmetic plus the recorded history.
#[derive(Default)]
pub struct ProgressAggregator {
    history: RwLock<Vec<ProgressSnapshot>>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value-weighted completion over `rows` (item, verified quantity).
    pub fn project_progress(project_id: Uuid, rows: &[(BoqItem, Decimal)]) -> ProgressReport {
        let mut sanctioned_total = Decimal::ZERO;
        let mut verified_total = Decimal::ZERO;
        let items = rows
            .iter()
            .map(|(item, verified)| {
                let sanctioned_value = item.sanctioned_value();
                let verified_value = *verified * item.rate;
                sanctioned_total += sanctioned_value;
                verified_total += verified_value;
                ItemProgress {
                    boq_item_id: item.id,
                    code: item.code.clone(),
                    sanctioned_quantity: item.sanctioned_quantity,
                    verified_quantity: *verified,
                    sanctioned_value,
                    verified_value,
                    percentage: item_percentage(item.sanctioned_quantity, *verified),
                    overrun: item.is_overrun(*verified),
                }
            })
            .collect();

        ProgressReport {
            project_id,
            percentage: round2(ratio_percent(verified_total, sanctioned_total).min(HUNDRED)),
            items,
        }
    }

    /// Duration-weighted share of planned work that should be done by `as_of`.
    pub fn expected_progress(milestones: &[Milestone], as_of: NaiveDate) -> Decimal {
        if milestones.is_empty() {
            return Decimal::ZERO;
        }
        let planned: i64 = milestones.iter().map(Milestone::planned_days).sum();
        if planned == 0 {
            let due = milestones
                .iter()
                .filter(|milestone| milestone.planned_end <= as_of)
                .count();
            return round2(ratio_percent(
                Decimal::from(due as u64),
                Decimal::from(milestones.len() as u64),
            ));
        }
        let elapsed: i64 = milestones
            .iter()
            .map(|milestone| milestone.elapsed_days(as_of))
            .sum();
        round2(ratio_percent(Decimal::from(elapsed), Decimal::from(planned)))
    }

    pub fn schedule_variance(
        report: &ProgressReport,
        milestones: &[Milestone],
        as_of: NaiveDate,
    ) -> ScheduleVariance {
        let expected = Self::expected_progress(milestones, as_of);
        ScheduleVariance {
            project_id: report.project_id,
            as_of,
            actual: report.percentage,
            expected,
            variance: report.percentage - expected,
        }
    }

    /// Appends a snapshot; sequence numbers grow strictly.
    pub fn record(
        &self,
        project_id: Uuid,
        execution_id: Uuid,
        boq_item_id: Uuid,
        percentage: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> Result<ProgressSnapshot, CoreError> {
        let mut history = self
            .history
            .write()
            .map_err(|_| CoreError::poisoned("progress history"))?;
        let sequence = history.last().map(|last| last.sequence + 1).unwrap_or(1);
        let snapshot = ProgressSnapshot {
            sequence,
            project_id,
            execution_id,
            boq_item_id,
            percentage,
            recorded_at,
        };
        history.push(snapshot.clone());
        Ok(snapshot)
    }

    pub fn history(&self, project_id: Uuid) -> Result<Vec<ProgressSnapshot>, CoreError> {
        Ok(self
            .history
            .read()
            .map_err(|_| CoreError::poisoned("progress history"))?
            .iter()
            .filter(|snapshot| snapshot.project_id == project_id)
            .cloned()
            .collect())
    }

    pub fn all(&self) -> Result<Vec<ProgressSnapshot>, CoreError> {
        Ok(self
            .history
            .read()
            .map_err(|_| CoreError::poisoned("progress history"))?
            .clone())
    }

    pub(crate) fn restore(&self, mut snapshots: Vec<ProgressSnapshot>) -> Result<(), CoreError> {
        snapshots.sort_by_key(|snapshot| snapshot.sequence);
        let mut history = self
            .history
            .write()
            .map_err(|_| CoreError::poisoned("progress history"))?;
        *history = snapshots;
        Ok(())
    }
}

fn item_percentage(sanctioned: Decimal, verified: Decimal) -> Decimal {
    if sanctioned.is_zero() {
        return if verified > Decimal::ZERO {
            HUNDRED
        } else {
            Decimal::ZERO
        };
    }
    round2(ratio_percent(verified, sanctioned).min(HUNDRED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn value_weighted_progress_matches_worked_example() {
        let project = Uuid::new_v4();
        let a = BoqItem::new(project, "A", "Item A", "nos", Decimal::from(100), Decimal::from(10));
        let b = BoqItem::new(project, "B", "Item B", "nos", Decimal::from(100), Decimal::from(30));
        let rows = vec![(a, Decimal::from(100)), (b, Decimal::ZERO)];

        let report = ProgressAggregator::project_progress(project, &rows);
        assert_eq!(report.percentage, Decimal::from(25));
        assert_eq!(report.items[0].percentage, Decimal::from(100));
        assert_eq!(report.items[1].percentage, Decimal::ZERO);
    }

    #[test]
    fn overrun_items_are_flagged_and_capped() {
        let project = Uuid::new_v4();
        let item = BoqItem::new(project, "A", "Item", "m", Decimal::from(1000), Decimal::ONE);
        let report = ProgressAggregator::project_progress(project, &[(item, Decimal::from(1010))]);
        assert_eq!(report.percentage, Decimal::from(100));
        assert_eq!(report.overrun_items().count(), 1);
    }

    #[test]
    fn empty_project_is_zero_percent() {
        let report = ProgressAggregator::project_progress(Uuid::new_v4(), &[]);
        assert_eq!(report.percentage, Decimal::ZERO);
    }

    #[test]
    fn schedule_variance_is_actual_minus_expected() {
        let project = Uuid::new_v4();
        let milestones = vec![
            Milestone::new(project, "Earthwork", date(2025, 1, 1), date(2025, 1, 11)),
            Milestone::new(project, "Paving", date(2025, 1, 11), date(2025, 2, 10)),
        ];
        // 10 of 10 days plus 0 of 30 days
        let expected = ProgressAggregator::expected_progress(&milestones, date(2025, 1, 11));
        assert_eq!(expected, Decimal::from(25));

        let report = ProgressReport {
            project_id: project,
            percentage: Decimal::from(10),
            items: Vec::new(),
        };
        let variance =
            ProgressAggregator::schedule_variance(&report, &milestones, date(2025, 1, 11));
        assert_eq!(variance.variance, Decimal::from(-15));
    }

    #[test]
    fn history_is_append_only_and_sequenced() {
        let aggregator = ProgressAggregator::new();
        let project = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();
        aggregator
            .record(project, Uuid::new_v4(), Uuid::new_v4(), Decimal::from(5), now)
            .unwrap();
        aggregator
            .record(other, Uuid::new_v4(), Uuid::new_v4(), Decimal::from(1), now)
            .unwrap();
        aggregator
            .record(project, Uuid::new_v4(), Uuid::new_v4(), Decimal::from(9), now)
            .unwrap();

        let history = aggregator.history(project).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sequence, 1);
        assert_eq!(history[1].sequence, 3);
        assert!(history[0].percentage < history[1].percentage);
    }
}

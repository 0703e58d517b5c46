//! Projects and their planned schedule milestones.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl Project {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
        }
    }
}

impl Identifiable for Project {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Project {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Project {
    fn display_label(&self) -> String {
        format!("{} {}", self.code, self.name)
    }
}

/// A planned span of work used to derive time-based expected progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boq_item_id: Option<Uuid>,
    pub name: String,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
}

impl Milestone {
    pub fn new(
        project_id: Uuid,
        name: impl Into<String>,
        planned_start: NaiveDate,
        planned_end: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            boq_item_id: None,
            name: name.into(),
            planned_start,
            planned_end,
        }
    }

    pub fn linked_to(mut self, boq_item_id: Uuid) -> Self {
        self.boq_item_id = Some(boq_item_id);
        self
    }

    /// Planned duration in whole days; zero for same-day milestones.
    pub fn planned_days(&self) -> i64 {
        (self.planned_end - self.planned_start).num_days().max(0)
    }

    /// Days elapsed by `as_of`, clamped to `[0, planned_days]`.
    pub fn elapsed_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.planned_start)
            .num_days()
            .clamp(0, self.planned_days())
    }
}

impl Identifiable for Milestone {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Milestone {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_days_is_clamped_to_plan() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        let milestone = Milestone::new(Uuid::new_v4(), "Earthwork", start, end);

        assert_eq!(milestone.planned_days(), 10);
        assert_eq!(
            milestone.elapsed_days(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()),
            0
        );
        assert_eq!(
            milestone.elapsed_days(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()),
            5
        );
        assert_eq!(
            milestone.elapsed_days(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
            10
        );
    }
}

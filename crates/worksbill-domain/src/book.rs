//! Serializable snapshot of every record the engine owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    actor::Actor,
    approval::ApprovalRequest,
    bill::RaBill,
    boq::{BoqItem, LedgerBalance},
    execution::Execution,
    funding::{BudgetLineItem, FundHead},
    progress::ProgressSnapshot,
    project::{Milestone, Project},
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBook {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub boq_items: Vec<BoqItem>,
    #[serde(default)]
    pub balances: Vec<LedgerBalance>,
    #[serde(default)]
    pub executions: Vec<Execution>,
    #[serde(default)]
    pub bills: Vec<RaBill>,
    #[serde(default)]
    pub approvals: Vec<ApprovalRequest>,
    #[serde(default)]
    pub fund_heads: Vec<FundHead>,
    #[serde(default)]
    pub budget_lines: Vec<BudgetLineItem>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub progress_history: Vec<ProgressSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "ProjectBook::schema_version_default")]
    pub schema_version: u8,
}

impl ProjectBook {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            projects: Vec::new(),
            actors: Vec::new(),
            boq_items: Vec::new(),
            balances: Vec::new(),
            executions: Vec::new(),
            bills: Vec::new(),
            approvals: Vec::new(),
            fund_heads: Vec::new(),
            budget_lines: Vec::new(),
            milestones: Vec::new(),
            progress_history: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn project(&self, id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn boq_item(&self, id: Uuid) -> Option<&BoqItem> {
        self.boq_items.iter().find(|item| item.id == id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collections_deserialize_as_empty() {
        let json = r#"{
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "name": "Legacy",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }"#;
        let book: ProjectBook = serde_json::from_str(json).unwrap();
        assert!(book.executions.is_empty());
        assert!(book.progress_history.is_empty());
        assert_eq!(book.schema_version, CURRENT_SCHEMA_VERSION);
    }
}

//! Funding sources and their per-project allocations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FundHead {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl FundHead {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
        }
    }
}

impl Identifiable for FundHead {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for FundHead {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Amount of a fund head earmarked for a project in one fiscal year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetLineItem {
    pub id: Uuid,
    pub fund_head_id: Uuid,
    pub project_id: Uuid,
    pub fiscal_year: String,
    pub allocated_amount: Decimal,
}

impl BudgetLineItem {
    pub fn new(
        fund_head_id: Uuid,
        project_id: Uuid,
        fiscal_year: impl Into<String>,
        allocated_amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fund_head_id,
            project_id,
            fiscal_year: fiscal_year.into(),
            allocated_amount,
        }
    }
}

impl Identifiable for BudgetLineItem {
    fn id(&self) -> Uuid {
        self.id
    }
}

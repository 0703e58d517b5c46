//! Bill of Quantities line items and ledger balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A sanctioned line of contracted work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoqItem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub code: String,
    pub description: String,
    pub unit: String,
    pub sanctioned_quantity: Decimal,
    pub rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_head_id: Option<Uuid>,
}

impl BoqItem {
    pub fn new(
        project_id: Uuid,
        code: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        sanctioned_quantity: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            code: code.into(),
            description: description.into(),
            unit: unit.into(),
            sanctioned_quantity,
            rate,
            fund_head_id: None,
        }
    }

    pub fn with_fund_head(mut self, fund_head_id: Uuid) -> Self {
        self.fund_head_id = Some(fund_head_id);
        self
    }

    /// Contract value of the full sanctioned quantity.
    pub fn sanctioned_value(&self) -> Decimal {
        self.sanctioned_quantity * self.rate
    }

    pub fn is_overrun(&self, verified_quantity: Decimal) -> bool {
        verified_quantity > self.sanctioned_quantity
    }
}

impl Identifiable for BoqItem {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for BoqItem {
    fn display_label(&self) -> String {
        format!("{} {} ({})", self.code, self.description, self.unit)
    }
}

/// Persisted running total of verified quantity for one item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerBalance {
    pub boq_item_id: Uuid,
    pub verified_quantity: Decimal,
}

/// Outcome of a single ledger increment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub boq_item_id: Uuid,
    pub new_total: Decimal,
    pub overrun: bool,
}

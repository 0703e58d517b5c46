//! Running-Account bills and the deduction summary derived for them.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{boq::LedgerBalance, common::*};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Draft,
    Verified,
    Paid,
}

impl BillStatus {
    /// Position in the one-way lifecycle; used to detect "already in or past".
    pub fn rank(self) -> u8 {
        match self {
            BillStatus::Draft => 0,
            BillStatus::Verified => 1,
            BillStatus::Paid => 2,
        }
    }

    pub fn is_immutable(self) -> bool {
        self == BillStatus::Paid
    }
}

impl StatusVocabulary for BillStatus {
    fn label(self) -> &'static str {
        match self {
            BillStatus::Draft => "DRAFT",
            BillStatus::Verified => "VERIFIED",
            BillStatus::Paid => "PAID",
        }
    }

    fn tone(self) -> StatusTone {
        match self {
            BillStatus::Draft => StatusTone::Neutral,
            BillStatus::Verified => StatusTone::Pending,
            BillStatus::Paid => StatusTone::Positive,
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether GST is only reported or also withheld from the net payable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GstTreatment {
    #[default]
    Informational,
    Withheld,
}

/// Raw deduction parameters of a bill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EtpInput {
    pub gross_amount: Decimal,
    pub gst_percentage: Decimal,
    pub retention_percentage: Decimal,
    #[serde(default)]
    pub other_deductions: Decimal,
    #[serde(default)]
    pub advances_recovery: Decimal,
}

impl EtpInput {
    pub fn new(
        gross_amount: Decimal,
        gst_percentage: Decimal,
        retention_percentage: Decimal,
        other_deductions: Decimal,
        advances_recovery: Decimal,
    ) -> Self {
        Self {
            gross_amount,
            gst_percentage,
            retention_percentage,
            other_deductions,
            advances_recovery,
        }
    }
}

/// Derived amounts for a bill; every field is rounded to two decimals exactly once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillSummary {
    pub gross_amount: Decimal,
    pub retention_amount: Decimal,
    pub gst_amount: Decimal,
    pub other_deductions: Decimal,
    pub advances_recovery: Decimal,
    pub total_deductions: Decimal,
    pub net_payable: Decimal,
    pub gst_treatment: GstTreatment,
    /// Deductions exceed the gross amount; the contractor owes money back.
    pub over_recovery: bool,
}

/// Caller-supplied fields for creating or editing a bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillDraft {
    pub bill_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_head_id: Option<Uuid>,
    pub input: EtpInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaBill {
    pub id: Uuid,
    pub project_id: Uuid,
    pub bill_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_head_id: Option<Uuid>,
    pub input: EtpInput,
    pub summary: BillSummary,
    pub status: BillStatus,
    /// Verified quantities per BOQ item when the bill was raised.
    #[serde(default)]
    pub ledger_snapshot: Vec<LedgerBalance>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl RaBill {
    pub fn snapshot_quantity(&self, boq_item_id: Uuid) -> Decimal {
        self.ledger_snapshot
            .iter()
            .find(|balance| balance.boq_item_id == boq_item_id)
            .map(|balance| balance.verified_quantity)
            .unwrap_or(Decimal::ZERO)
    }
}

impl Identifiable for RaBill {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for RaBill {
    fn display_label(&self) -> String {
        format!("RA {} [{}] net {}", self.bill_number, self.status, self.summary.net_payable)
    }
}

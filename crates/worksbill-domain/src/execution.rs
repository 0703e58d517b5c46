//! Execution records: one submission of physical work against one BOQ item.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{boq::LedgerUpdate, common::*};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Draft,
    Submitted,
    Verified,
    Rejected,
    Revised,
}

impl ExecutionStatus {
    pub const ALL: [ExecutionStatus; 5] = [
        ExecutionStatus::Draft,
        ExecutionStatus::Submitted,
        ExecutionStatus::Verified,
        ExecutionStatus::Rejected,
        ExecutionStatus::Revised,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Verified | ExecutionStatus::Rejected)
    }

    /// Draft and revised records are back in the submitter's hands.
    pub fn is_editable(self) -> bool {
        matches!(self, ExecutionStatus::Draft | ExecutionStatus::Revised)
    }

    /// Resulting status of `action`, or `None` when the transition is not permitted.
    pub fn apply(self, action: ExecutionAction) -> Option<ExecutionStatus> {
        use ExecutionAction as A;
        use ExecutionStatus as S;
        match (self, action) {
            (S::Draft, A::Update) => Some(S::Draft),
            (S::Revised, A::Update) => Some(S::Revised),
            (S::Draft, A::Submit) | (S::Revised, A::Submit) => Some(S::Submitted),
            (S::Submitted, A::Verify) => Some(S::Verified),
            (S::Submitted, A::Reject) => Some(S::Rejected),
            (S::Submitted, A::RequestRevision) => Some(S::Revised),
            // Deletion has no successor state; the guard is `can_delete`.
            _ => None,
        }
    }

    pub fn can_delete(self) -> bool {
        self == ExecutionStatus::Draft
    }
}

impl StatusVocabulary for ExecutionStatus {
    fn label(self) -> &'static str {
        match self {
            ExecutionStatus::Draft => "DRAFT",
            ExecutionStatus::Submitted => "SUBMITTED",
            ExecutionStatus::Verified => "VERIFIED",
            ExecutionStatus::Rejected => "REJECTED",
            ExecutionStatus::Revised => "REVISED",
        }
    }

    fn tone(self) -> StatusTone {
        match self {
            ExecutionStatus::Draft => StatusTone::Neutral,
            ExecutionStatus::Submitted => StatusTone::Pending,
            ExecutionStatus::Verified => StatusTone::Positive,
            ExecutionStatus::Rejected => StatusTone::Negative,
            ExecutionStatus::Revised => StatusTone::Attention,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operations the workflow accepts on an existing execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExecutionAction {
    Update,
    Delete,
    Submit,
    Verify,
    Reject,
    RequestRevision,
}

impl ExecutionAction {
    pub const ALL: [ExecutionAction; 6] = [
        ExecutionAction::Update,
        ExecutionAction::Delete,
        ExecutionAction::Submit,
        ExecutionAction::Verify,
        ExecutionAction::Reject,
        ExecutionAction::RequestRevision,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExecutionAction::Update => "update",
            ExecutionAction::Delete => "delete",
            ExecutionAction::Submit => "submit",
            ExecutionAction::Verify => "verify",
            ExecutionAction::Reject => "reject",
            ExecutionAction::RequestRevision => "request revision",
        }
    }

    /// Whether the action is allowed from `status`.
    pub fn permitted_from(self, status: ExecutionStatus) -> bool {
        match self {
            ExecutionAction::Delete => status.can_delete(),
            other => status.apply(other).is_some(),
        }
    }
}

impl fmt::Display for ExecutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caller-supplied fields for creating or editing an execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionDraft {
    pub boq_item_id: Uuid,
    pub executed_quantity: Decimal,
    pub execution_date: NaiveDate,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    #[serde(default)]
    pub remarks: String,
}

impl ExecutionDraft {
    pub fn validate(&self) -> Result<(), ExecutionDraftError> {
        if self.executed_quantity <= Decimal::ZERO {
            return Err(ExecutionDraftError::NonPositiveQuantity);
        }
        if self.period_from > self.period_to {
            return Err(ExecutionDraftError::PeriodReversed);
        }
        if self.period_to > self.execution_date {
            return Err(ExecutionDraftError::PeriodAfterExecution);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Field-level problems with an [`ExecutionDraft`].
pub enum ExecutionDraftError {
    NonPositiveQuantity,
    PeriodReversed,
    PeriodAfterExecution,
}

impl fmt::Display for ExecutionDraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionDraftError::NonPositiveQuantity => {
                f.write_str("executed_quantity must be greater than zero")
            }
            ExecutionDraftError::PeriodReversed => {
                f.write_str("period_from must not be after period_to")
            }
            ExecutionDraftError::PeriodAfterExecution => {
                f.write_str("period_to must not be after execution_date")
            }
        }
    }
}

impl std::error::Error for ExecutionDraftError {}

/// Audit copy of a submission that was sent back for revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionRevision {
    pub revision: u32,
    pub executed_quantity: Decimal,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub remarks: String,
    pub note: String,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Execution {
    pub id: Uuid,
    pub boq_item_id: Uuid,
    pub executed_quantity: Decimal,
    pub execution_date: NaiveDate,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub remarks: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_id: Option<Uuid>,
    pub submitted_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<ExecutionRevision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_effect: Option<LedgerUpdate>,
    /// Bumped on every committed change; transitions are conditional on it.
    #[serde(default)]
    pub version: u64,
}

impl Execution {
    pub fn from_draft(draft: ExecutionDraft, submitted_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            boq_item_id: draft.boq_item_id,
            executed_quantity: draft.executed_quantity,
            execution_date: draft.execution_date,
            period_from: draft.period_from,
            period_to: draft.period_to,
            remarks: draft.remarks,
            status: ExecutionStatus::Draft,
            rejection_reason: None,
            verifier_id: None,
            submitted_by,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            decided_at: None,
            revisions: Vec::new(),
            ledger_effect: None,
            version: 0,
        }
    }

    pub fn apply_draft(&mut self, draft: ExecutionDraft) {
        self.boq_item_id = draft.boq_item_id;
        self.executed_quantity = draft.executed_quantity;
        self.execution_date = draft.execution_date;
        self.period_from = draft.period_from;
        self.period_to = draft.period_to;
        self.remarks = draft.remarks;
    }

    pub fn as_draft(&self) -> ExecutionDraft {
        ExecutionDraft {
            boq_item_id: self.boq_item_id,
            executed_quantity: self.executed_quantity,
            execution_date: self.execution_date,
            period_from: self.period_from,
            period_to: self.period_to,
            remarks: self.remarks.clone(),
        }
    }

    /// Value of the recorded quantity at the given rate.
    pub fn value_at(&self, rate: Decimal) -> Decimal {
        self.executed_quantity * rate
    }
}

impl Identifiable for Execution {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Execution {
    fn display_label(&self) -> String {
        format!("exec:{} [{}]", self.id, self.status)
    }
}

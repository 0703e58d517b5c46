//! Generic approval requests routed to a sanctioning authority.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl StatusVocabulary for ApprovalStatus {
    fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
        }
    }

    fn tone(self) -> StatusTone {
        match self {
            ApprovalStatus::Pending => StatusTone::Pending,
            ApprovalStatus::Approved => StatusTone::Positive,
            ApprovalStatus::Rejected => StatusTone::Negative,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an approval request is about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum ApprovalSubject {
    Bill(Uuid),
    BudgetChange(Uuid),
    QuantityOverrun(Uuid),
    Other(String),
}

impl fmt::Display for ApprovalSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalSubject::Bill(id) => write!(f, "bill:{id}"),
            ApprovalSubject::BudgetChange(id) => write!(f, "budget:{id}"),
            ApprovalSubject::QuantityOverrun(id) => write!(f, "overrun:{id}"),
            ApprovalSubject::Other(reference) => write!(f, "other:{reference}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub subject: ApprovalSubject,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub notes: String,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_notes: Option<String>,
    #[serde(default)]
    pub version: u64,
}

impl ApprovalRequest {
    pub fn new(
        subject: ApprovalSubject,
        notes: impl Into<String>,
        requested_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            status: ApprovalStatus::Pending,
            notes: notes.into(),
            requested_by,
            requested_at: now,
            decided_by: None,
            decided_at: None,
            decision_notes: None,
            version: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

impl Identifiable for ApprovalRequest {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for ApprovalRequest {
    fn display_label(&self) -> String {
        format!("request:{} {} [{}]", self.id, self.subject, self.status)
    }
}

//! Fire-and-forget notifications emitted on state transitions.

use std::{fmt, sync::Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    ExecutionSubmitted,
    ExecutionVerified,
    ExecutionRejected,
    RevisionRequested,
    QuantityOverrun,
    BillCreated,
    BillVerified,
    BillPaid,
    ApprovalRequested,
    ApprovalDecided,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::ExecutionSubmitted => "execution submitted",
            NotificationKind::ExecutionVerified => "execution verified",
            NotificationKind::ExecutionRejected => "execution rejected",
            NotificationKind::RevisionRequested => "revision requested",
            NotificationKind::QuantityOverrun => "quantity overrun",
            NotificationKind::BillCreated => "bill created",
            NotificationKind::BillVerified => "bill verified",
            NotificationKind::BillPaid => "bill paid",
            NotificationKind::ApprovalRequested => "approval requested",
            NotificationKind::ApprovalDecided => "approval decided",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject_id: Uuid,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        subject_id: Uuid,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            subject_id,
            message: message.into(),
            at,
        }
    }
}

/// Receives notifications. Delivery failures must never reach the caller.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            target: "worksbill::notify",
            kind = %notification.kind,
            subject = %notification.subject_id,
            "{}",
            notification.message
        );
    }
}

/// Keeps every notification in memory and echoes it to tracing; used by the CLI and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        TracingNotifier.notify(notification.clone());
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(notification);
        }
    }
}

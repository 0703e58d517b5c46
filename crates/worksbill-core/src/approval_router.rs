//! Bill lifecycle and generic approval requests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use uuid::Uuid;
use worksbill_domain::{
    Actor, ApprovalRequest, ApprovalStatus, ApprovalSubject, BillStatus, GstTreatment, RaBill,
    Role,
};

use crate::{
    notify::{Notification, NotificationKind, NotificationSink},
    registry::Registry,
    time::Clock,
    CoreError,
};

/// Runtime switches that change how bills and requests are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineSettings {
    pub gst_treatment: GstTreatment,
    /// Paying a bill needs an APPROVED request whose subject is that bill.
    pub payment_requires_approval: bool,
    /// Overrunning verifications open a QuantityOverrun request for the item.
    pub open_overrun_requests: bool,
}

pub struct ApprovalRouter {
    bills: Registry<RaBill>,
    requests: Registry<ApprovalRequest>,
    pending: Mutex<HashMap<ApprovalSubject, Uuid>>,
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
}

impl ApprovalRouter {
    pub fn new(
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            bills: Registry::new(),
            requests: Registry::new(),
            pending: Mutex::new(HashMap::new()),
            settings,
            clock,
            notifier,
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn register_bill(&self, bill: RaBill) -> Result<RaBill, CoreError> {
        self.bills.insert(bill.clone())?;
        tracing::info!(bill = %bill.bill_number, net = %bill.summary.net_payable, "bill created");
        self.notifier.notify(Notification::new(
            NotificationKind::BillCreated,
            bill.id,
            format!(
                "bill {} raised for {} (net {})",
                bill.bill_number, bill.summary.gross_amount, bill.summary.net_payable
            ),
            self.clock.now(),
        ));
        Ok(bill)
    }

    pub fn bill(&self, id: Uuid) -> Result<RaBill, CoreError> {
        self.bills.get(id)
    }

    /// Bills of a project in creation order.
    pub fn bills_for_project(&self, project_id: Uuid) -> Result<Vec<RaBill>, CoreError> {
        let mut bills: Vec<RaBill> = self
            .bills
            .list()?
            .into_iter()
            .filter(|bill| bill.project_id == project_id)
            .collect();
        bills.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.bill_number.cmp(&b.bill_number)));
        Ok(bills)
    }

    pub fn all_bills(&self) -> Result<Vec<RaBill>, CoreError> {
        let mut bills = self.bills.list()?;
        bills.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(bills)
    }

    /// Edits a DRAFT bill through `edit`; any later status is rejected.
    pub fn update_bill_draft<F>(&self, id: Uuid, actor: &Actor, edit: F) -> Result<RaBill, CoreError>
    where
        F: FnOnce(&mut RaBill) -> Result<(), CoreError>,
    {
        let observed = self.bills.get(id)?;
        if observed.status != BillStatus::Draft {
            return Err(CoreError::invalid_transition("bill", observed.status, "update"));
        }
        if actor.id != observed.created_by {
            return Err(CoreError::Unauthorized(format!(
                "only the author may update bill {}",
                observed.bill_number
            )));
        }
        let now = self.clock.now();
        self.bills.compare_and_update(id, observed.version, |bill| {
            edit(bill)?;
            bill.updated_at = now;
            Ok(())
        })
    }

    pub fn verify_bill(&self, id: Uuid, actor: &Actor) -> Result<RaBill, CoreError> {
        let observed = self.bills.get(id)?;
        if observed.status.rank() >= BillStatus::Verified.rank() {
            return Err(CoreError::invalid_transition("bill", observed.status, "verify"));
        }
        if !(actor.has_role(Role::Verifier) || actor.has_role(Role::Accounts)) {
            return Err(CoreError::Unauthorized(
                "verifying a bill requires the verifier or accounts role".into(),
            ));
        }
        let now = self.clock.now();
        let bill = self.bills.compare_and_update(id, observed.version, |bill| {
            bill.status = BillStatus::Verified;
            bill.verified_by = Some(actor.id);
            bill.verified_at = Some(now);
            bill.updated_at = now;
            Ok(())
        })?;
        self.announce(NotificationKind::BillVerified, &bill);
        Ok(bill)
    }

    pub fn pay_bill(&self, id: Uuid, actor: &Actor) -> Result<RaBill, CoreError> {
        let observed = self.bills.get(id)?;
        if observed.status != BillStatus::Verified {
            return Err(CoreError::invalid_transition("bill", observed.status, "pay"));
        }
        if !actor.has_role(Role::Accounts) {
            return Err(CoreError::Unauthorized(
                "paying a bill requires the accounts role".into(),
            ));
        }
        if self.settings.payment_requires_approval && !self.is_approved(&ApprovalSubject::Bill(id))? {
            return Err(CoreError::Validation(format!(
                "bill {} has no approved payment request",
                observed.bill_number
            )));
        }
        let now = self.clock.now();
        let bill = self.bills.compare_and_update(id, observed.version, |bill| {
            bill.status = BillStatus::Paid;
            bill.paid_by = Some(actor.id);
            bill.paid_at = Some(now);
            bill.updated_at = now;
            Ok(())
        })?;
        self.announce(NotificationKind::BillPaid, &bill);
        Ok(bill)
    }

    /// Opens a PENDING request; a subject may only have one at a time.
    pub fn open_request(
        &self,
        subject: ApprovalSubject,
        notes: impl Into<String>,
        actor: &Actor,
    ) -> Result<ApprovalRequest, CoreError> {
        if let ApprovalSubject::Bill(bill_id) = &subject {
            self.bills.get(*bill_id)?;
        }
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| CoreError::poisoned("pending requests"))?;
        if let Some(existing) = pending.get(&subject) {
            return Err(CoreError::Conflict(format!(
                "{subject} already has pending request {existing}"
            )));
        }
        let request = ApprovalRequest::new(subject.clone(), notes, actor.id, self.clock.now());
        self.requests.insert(request.clone())?;
        pending.insert(subject, request.id);
        drop(pending);

        tracing::info!(request = %request.id, subject = %request.subject, "approval requested");
        self.notifier.notify(Notification::new(
            NotificationKind::ApprovalRequested,
            request.id,
            format!("approval requested for {}", request.subject),
            self.clock.now(),
        ));
        Ok(request)
    }

    pub fn approve(
        &self,
        id: Uuid,
        actor: &Actor,
        notes: impl Into<String>,
    ) -> Result<ApprovalRequest, CoreError> {
        self.decide(id, actor, ApprovalStatus::Approved, notes.into())
    }

    pub fn reject(
        &self,
        id: Uuid,
        actor: &Actor,
        notes: impl Into<String>,
    ) -> Result<ApprovalRequest, CoreError> {
        self.decide(id, actor, ApprovalStatus::Rejected, notes.into())
    }

    pub fn request(&self, id: Uuid) -> Result<ApprovalRequest, CoreError> {
        self.requests.get(id)
    }

    pub fn requests(&self) -> Result<Vec<ApprovalRequest>, CoreError> {
        let mut requests = self.requests.list()?;
        requests.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    pub fn pending_for(&self, subject: &ApprovalSubject) -> Result<Option<Uuid>, CoreError> {
        Ok(self
            .pending
            .lock()
            .map_err(|_| CoreError::poisoned("pending requests"))?
            .get(subject)
            .copied())
    }

    pub(crate) fn restore_bill(&self, bill: RaBill) -> Result<(), CoreError> {
        self.bills.insert(bill)
    }

    pub(crate) fn restore_request(&self, request: ApprovalRequest) -> Result<(), CoreError> {
        if request.is_pending() {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| CoreError::poisoned("pending requests"))?;
            if pending.contains_key(&request.subject) {
                return Err(CoreError::Validation(format!(
                    "{} has more than one pending request",
                    request.subject
                )));
            }
            pending.insert(request.subject.clone(), request.id);
        }
        self.requests.insert(request)
    }

    fn decide(
        &self,
        id: Uuid,
        actor: &Actor,
        outcome: ApprovalStatus,
        notes: String,
    ) -> Result<ApprovalRequest, CoreError> {
        if !actor.has_role(Role::Approver) {
            return Err(CoreError::Unauthorized(
                "deciding a request requires the approver role".into(),
            ));
        }
        let observed = self.requests.get(id)?;
        if !observed.is_pending() {
            return Err(CoreError::Conflict(format!(
                "request {id} was already {}",
                observed.status
            )));
        }
        let now = self.clock.now();
        // The pending index is locked across the commit so it never outlives the decision.
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| CoreError::poisoned("pending requests"))?;
        let decided = self.requests.compare_and_update(id, observed.version, |request| {
            request.status = outcome;
            request.decided_by = Some(actor.id);
            request.decided_at = Some(now);
            let notes = notes.trim();
            request.decision_notes = (!notes.is_empty()).then(|| notes.to_string());
            Ok(())
        })?;
        if pending.get(&decided.subject) == Some(&decided.id) {
            pending.remove(&decided.subject);
        }
        drop(pending);
        tracing::info!(request = %decided.id, status = %decided.status, "approval decided");
        self.notifier.notify(Notification::new(
            NotificationKind::ApprovalDecided,
            decided.id,
            format!("{} {}", decided.subject, decided.status),
            now,
        ));
        Ok(decided)
    }

    fn is_approved(&self, subject: &ApprovalSubject) -> Result<bool, CoreError> {
        Ok(self
            .requests
            .list()?
            .iter()
            .any(|request| &request.subject == subject && request.status == ApprovalStatus::Approved))
    }

    fn announce(&self, kind: NotificationKind, bill: &RaBill) {
        tracing::info!(bill = %bill.bill_number, status = %bill.status, "bill transition");
        self.notifier.notify(Notification::new(
            kind,
            bill.id,
            format!("bill {} is now {}", bill.bill_number, bill.status),
            self.clock.now(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bill_calculator::calculate_etp, notify::RecordingNotifier, time::ManualClock};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use worksbill_domain::EtpInput;

    fn router(settings: EngineSettings) -> (ApprovalRouter, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        ));
        (ApprovalRouter::new(settings, clock, notifier.clone()), notifier)
    }

    fn draft_bill(author: &Actor) -> RaBill {
        let gross = Decimal::from(100_000);
        let input = EtpInput::new(gross, Decimal::from(18), Decimal::from(5), Decimal::ZERO, Decimal::ZERO);
        let now = Utc::now();
        RaBill {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            bill_number: "RA-01".into(),
            fund_head_id: None,
            input,
            summary: calculate_etp(gross, input.gst_percentage, input.retention_percentage, Decimal::ZERO, Decimal::ZERO).unwrap(),
            status: BillStatus::Draft,
            ledger_snapshot: Vec::new(),
            created_by: author.id,
            created_at: now,
            updated_at: now,
            verified_by: None,
            verified_at: None,
            paid_by: None,
            paid_at: None,
            version: 0,
        }
    }

    #[test]
    fn bill_moves_forward_only() {
        let (router, notifier) = router(EngineSettings::default());
        let author = Actor::new("Contractor", Role::Submitter);
        let checker = Actor::new("EE", Role::Verifier);
        let accounts = Actor::new("DDO", Role::Accounts);
        let bill = router.register_bill(draft_bill(&author)).unwrap();

        let early = router.pay_bill(bill.id, &accounts).unwrap_err();
        assert!(early.is_invalid_transition());

        router.verify_bill(bill.id, &checker).unwrap();
        assert!(router.verify_bill(bill.id, &checker).unwrap_err().is_invalid_transition());

        let paid = router.pay_bill(bill.id, &accounts).unwrap();
        assert_eq!(paid.status, BillStatus::Paid);
        assert_eq!(paid.paid_by, Some(accounts.id));
        assert!(router.pay_bill(bill.id, &accounts).unwrap_err().is_invalid_transition());
        assert!(router.verify_bill(bill.id, &checker).unwrap_err().is_invalid_transition());
        assert_eq!(notifier.count(NotificationKind::BillPaid), 1);
    }

    #[test]
    fn payment_can_require_an_approved_request() {
        let (router, _) = router(EngineSettings {
            payment_requires_approval: true,
            ..EngineSettings::default()
        });
        let author = Actor::new("Contractor", Role::Submitter);
        let checker = Actor::new("EE", Role::Verifier);
        let accounts = Actor::new("DDO", Role::Accounts);
        let approver = Actor::new("SE", Role::Approver);
        let bill = router.register_bill(draft_bill(&author)).unwrap();
        router.verify_bill(bill.id, &checker).unwrap();

        assert!(matches!(
            router.pay_bill(bill.id, &accounts),
            Err(CoreError::Validation(_))
        ));

        let request = router
            .open_request(ApprovalSubject::Bill(bill.id), "release RA-01", &accounts)
            .unwrap();
        router.approve(request.id, &approver, "ok").unwrap();
        assert_eq!(router.pay_bill(bill.id, &accounts).unwrap().status, BillStatus::Paid);
    }

    #[test]
    fn one_pending_request_per_subject_and_single_decision() {
        let (router, _) = router(EngineSettings::default());
        let clerk = Actor::new("Clerk", Role::Submitter);
        let approver = Actor::new("SE", Role::Approver);
        let subject = ApprovalSubject::Other("budget-revision-7".into());

        let request = router.open_request(subject.clone(), "", &clerk).unwrap();
        assert!(router.open_request(subject.clone(), "", &clerk).unwrap_err().is_conflict());

        let rejected = router.reject(request.id, &approver, "insufficient funds").unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
        assert_eq!(rejected.decision_notes.as_deref(), Some("insufficient funds"));
        assert!(router.approve(request.id, &approver, "").unwrap_err().is_conflict());

        let reopened = router.open_request(subject, "second try", &clerk).unwrap();
        assert!(reopened.is_pending());
    }

    #[test]
    fn poisoned_pending_index_fails_the_decision_and_keeps_it_pending() {
        let (router, _) = router(EngineSettings::default());
        let clerk = Actor::new("Clerk", Role::Submitter);
        let approver = Actor::new("SE", Role::Approver);
        let request = router
            .open_request(ApprovalSubject::Other("tender-12".into()), "", &clerk)
            .unwrap();

        std::thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _held = router.pending.lock().unwrap();
                panic!("poison the pending index");
            });
            assert!(poisoner.join().is_err());
        });

        let err = router.approve(request.id, &approver, "ok").unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(router.request(request.id).unwrap().is_pending());
    }

    #[test]
    fn decisions_need_the_approver_role() {
        let (router, _) = router(EngineSettings::default());
        let clerk = Actor::new("Clerk", Role::Submitter);
        let request = router
            .open_request(ApprovalSubject::Other("x".into()), "", &clerk)
            .unwrap();
        assert!(matches!(
            router.approve(request.id, &clerk, ""),
            Err(CoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn drafts_are_the_only_editable_bills() {
        let (router, _) = router(EngineSettings::default());
        let author = Actor::new("Contractor", Role::Submitter);
        let checker = Actor::new("EE", Role::Verifier);
        let bill = router.register_bill(draft_bill(&author)).unwrap();

        let renamed = router
            .update_bill_draft(bill.id, &author, |bill| {
                bill.bill_number = "RA-01A".into();
                Ok(())
            })
            .unwrap();
        assert_eq!(renamed.bill_number, "RA-01A");

        router.verify_bill(bill.id, &checker).unwrap();
        let err = router
            .update_bill_draft(bill.id, &author, |_| Ok(()))
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }
}

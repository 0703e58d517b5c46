//! State machine over execution records.
//!
//! Every transition is evaluated against the copy of the record the caller
//! observed and committed with a version-guarded update. A caller whose
//! observation went stale gets `Conflict`, and so does a submit that finds the
//! record already SUBMITTED: whichever way two submitters interleave, only the
//! first wins. Any other transition the observed status does not allow gets
//! `InvalidStateTransition`.

use std::sync::Arc;

use uuid::Uuid;
use worksbill_domain::{
    Actor, Execution, ExecutionAction, ExecutionDraft, ExecutionRevision, ExecutionStatus, Role,
};

use crate::{
    boq_ledger::BoqLedger,
    notify::{Notification, NotificationKind, NotificationSink},
    registry::Registry,
    time::Clock,
    CoreError,
};

/// A transition request against an existing execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionCommand {
    Update(ExecutionDraft),
    Submit,
    Verify,
    Reject { reason: String },
    RequestRevision { note: String },
}

impl ExecutionCommand {
    pub fn action(&self) -> ExecutionAction {
        match self {
            ExecutionCommand::Update(_) => ExecutionAction::Update,
            ExecutionCommand::Submit => ExecutionAction::Submit,
            ExecutionCommand::Verify => ExecutionAction::Verify,
            ExecutionCommand::Reject { .. } => ExecutionAction::Reject,
            ExecutionCommand::RequestRevision { .. } => ExecutionAction::RequestRevision,
        }
    }
}

pub struct ExecutionWorkflow {
    records: Registry<Execution>,
    ledger: Arc<BoqLedger>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
}

impl ExecutionWorkflow {
    pub fn new(
        ledger: Arc<BoqLedger>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            records: Registry::new(),
            ledger,
            clock,
            notifier,
        }
    }

    pub fn create(&self, actor: &Actor, draft: ExecutionDraft) -> Result<Execution, CoreError> {
        if !actor.has_role(Role::Submitter) {
            return Err(CoreError::Unauthorized(format!(
                "{} cannot record executions",
                actor.role
            )));
        }
        self.validate_draft(&draft)?;
        let execution = Execution::from_draft(draft, actor.id, self.clock.now());
        self.records.insert(execution.clone())?;
        tracing::info!(execution = %execution.id, item = %execution.boq_item_id, "execution created");
        Ok(execution)
    }

    pub fn get(&self, id: Uuid) -> Result<Execution, CoreError> {
        self.records.get(id)
    }

    pub fn list(&self) -> Result<Vec<Execution>, CoreError> {
        let mut executions = self.records.list()?;
        executions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(executions)
    }

    pub fn update(
        &self,
        id: Uuid,
        actor: &Actor,
        draft: ExecutionDraft,
    ) -> Result<Execution, CoreError> {
        let observed = self.records.get(id)?;
        self.apply(&observed, actor, ExecutionCommand::Update(draft))
    }

    pub fn submit(&self, id: Uuid, actor: &Actor) -> Result<Execution, CoreError> {
        let observed = self.records.get(id)?;
        self.apply(&observed, actor, ExecutionCommand::Submit)
    }

    pub fn verify(&self, id: Uuid, actor: &Actor) -> Result<Execution, CoreError> {
        let observed = self.records.get(id)?;
        self.apply(&observed, actor, ExecutionCommand::Verify)
    }

    pub fn reject(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Execution, CoreError> {
        let observed = self.records.get(id)?;
        self.apply(
            &observed,
            actor,
            ExecutionCommand::Reject {
                reason: reason.into(),
            },
        )
    }

    pub fn request_revision(
        &self,
        id: Uuid,
        actor: &Actor,
        note: impl Into<String>,
    ) -> Result<Execution, CoreError> {
        let observed = self.records.get(id)?;
        self.apply(
            &observed,
            actor,
            ExecutionCommand::RequestRevision { note: note.into() },
        )
    }

    /// Removes a DRAFT record. Anything that was ever submitted is retained for audit.
    pub fn delete(&self, id: Uuid, actor: &Actor) -> Result<Execution, CoreError> {
        let observed = self.records.get(id)?;
        if !ExecutionAction::Delete.permitted_from(observed.status) {
            return Err(CoreError::invalid_transition(
                "execution",
                observed.status,
                ExecutionAction::Delete,
            ));
        }
        self.authorize(&observed, actor, ExecutionAction::Delete)?;
        let removed = self.records.remove_if(id, observed.version, |current| {
            if current.status.can_delete() {
                Ok(())
            } else {
                Err(CoreError::invalid_transition(
                    "execution",
                    current.status,
                    ExecutionAction::Delete,
                ))
            }
        })?;
        tracing::info!(execution = %id, "draft execution deleted");
        Ok(removed)
    }

    /// Applies `command` to the caller's observed copy of a record.
    pub fn apply(
        &self,
        observed: &Execution,
        actor: &Actor,
        command: ExecutionCommand,
    ) -> Result<Execution, CoreError> {
        let action = command.action();
        let Some(target) = observed.status.apply(action) else {
            return Err(refusal(observed, action));
        };
        self.authorize(observed, actor, action)?;
        let now = self.clock.now();

        let result = match command {
            ExecutionCommand::Update(draft) => {
                self.validate_draft(&draft)?;
                self.records
                    .compare_and_update(observed.id, observed.version, |exec| {
                        exec.apply_draft(draft);
                        exec.updated_at = now;
                        Ok(())
                    })
            }
            ExecutionCommand::Submit => {
                self.records
                    .compare_and_update(observed.id, observed.version, |exec| {
                        exec.status = target;
                        exec.submitted_at = Some(now);
                        exec.updated_at = now;
                        Ok(())
                    })
            }
            ExecutionCommand::Verify => self
                .ledger
                .record_verified_with(observed.boq_item_id, observed.executed_quantity, |update| {
                    let effect = *update;
                    self.records
                        .compare_and_update(observed.id, observed.version, |exec| {
                            exec.status = target;
                            exec.verifier_id = Some(actor.id);
                            exec.decided_at = Some(now);
                            exec.updated_at = now;
                            exec.ledger_effect = Some(effect);
                            Ok(())
                        })
                })
                .map(|(_, execution)| execution),
            ExecutionCommand::Reject { reason } => {
                let reason = reason.trim().to_string();
                if reason.is_empty() {
                    return Err(CoreError::Validation(
                        "a rejection reason is required".into(),
                    ));
                }
                self.records
                    .compare_and_update(observed.id, observed.version, |exec| {
                        exec.status = target;
                        exec.rejection_reason = Some(reason);
                        exec.verifier_id = Some(actor.id);
                        exec.decided_at = Some(now);
                        exec.updated_at = now;
                        Ok(())
                    })
            }
            ExecutionCommand::RequestRevision { note } => {
                self.records
                    .compare_and_update(observed.id, observed.version, |exec| {
                        let revision = ExecutionRevision {
                            revision: exec.revisions.len() as u32 + 1,
                            executed_quantity: exec.executed_quantity,
                            period_from: exec.period_from,
                            period_to: exec.period_to,
                            remarks: exec.remarks.clone(),
                            note: note.trim().to_string(),
                            requested_by: actor.id,
                            requested_at: now,
                        };
                        exec.revisions.push(revision);
                        exec.status = target;
                        exec.submitted_at = None;
                        exec.updated_at = now;
                        Ok(())
                    })
            }
        };

        match &result {
            Ok(execution) => self.announce(action, execution),
            Err(err) if err.is_conflict() => {
                tracing::warn!(execution = %observed.id, %action, "transition lost a race");
            }
            Err(_) => {}
        }
        result
    }

    /// Loads a persisted record verbatim; only used when rebuilding from a snapshot.
    pub(crate) fn restore(&self, execution: Execution) -> Result<(), CoreError> {
        self.records.insert(execution)
    }

    fn validate_draft(&self, draft: &ExecutionDraft) -> Result<(), CoreError> {
        draft
            .validate()
            .map_err(|err| CoreError::Validation(err.to_string()))?;
        if !self.ledger.contains(draft.boq_item_id) {
            return Err(CoreError::not_found("BOQ item", draft.boq_item_id));
        }
        Ok(())
    }

    fn authorize(
        &self,
        observed: &Execution,
        actor: &Actor,
        action: ExecutionAction,
    ) -> Result<(), CoreError> {
        match action {
            ExecutionAction::Update | ExecutionAction::Delete | ExecutionAction::Submit => {
                if actor.id != observed.submitted_by {
                    return Err(CoreError::Unauthorized(format!(
                        "only the submitter may {action} execution {}",
                        observed.id
                    )));
                }
            }
            ExecutionAction::Verify | ExecutionAction::Reject | ExecutionAction::RequestRevision => {
                if !actor.has_role(Role::Verifier) {
                    return Err(CoreError::Unauthorized(format!(
                        "{action} requires the verifier role"
                    )));
                }
            }
        }
        Ok(())
    }

    fn announce(&self, action: ExecutionAction, execution: &Execution) {
        let kind = match action {
            ExecutionAction::Submit => NotificationKind::ExecutionSubmitted,
            ExecutionAction::Verify => NotificationKind::ExecutionVerified,
            ExecutionAction::Reject => NotificationKind::ExecutionRejected,
            ExecutionAction::RequestRevision => NotificationKind::RevisionRequested,
            ExecutionAction::Update | ExecutionAction::Delete => return,
        };
        tracing::info!(execution = %execution.id, status = %execution.status, "execution transition");
        self.notifier.notify(Notification::new(
            kind,
            execution.id,
            format!(
                "execution {} is now {} ({} against item {})",
                execution.id, execution.status, execution.executed_quantity, execution.boq_item_id
            ),
            self.clock.now(),
        ));
        if let Some(effect) = execution.ledger_effect.filter(|effect| effect.overrun) {
            self.notifier.notify(Notification::new(
                NotificationKind::QuantityOverrun,
                effect.boq_item_id,
                format!(
                    "verified quantity {} exceeds sanctioned quantity on item {}",
                    effect.new_total, effect.boq_item_id
                ),
                self.clock.now(),
            ));
        }
    }
}

/// Error for an action the observed status does not allow.
fn refusal(observed: &Execution, action: ExecutionAction) -> CoreError {
    if action == ExecutionAction::Submit && observed.status == ExecutionStatus::Submitted {
        tracing::warn!(execution = %observed.id, "duplicate submit lost to an earlier one");
        return CoreError::Conflict(format!(
            "execution {} was already submitted",
            observed.id
        ));
    }
    CoreError::invalid_transition("execution", observed.status, action)
}

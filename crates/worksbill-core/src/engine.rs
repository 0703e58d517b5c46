//! Facade wiring the ledger, workflow, calculator, aggregator and router together.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use worksbill_domain::{
    Actor, ApprovalRequest, ApprovalSubject, BillDraft, BillStatus, BillSummary, BoqItem,
    BudgetLineItem, EtpInput, Execution, ExecutionDraft, ExecutionStatus, FundHead, Milestone,
    ProgressReport, ProgressSnapshot, Project, ProjectBook, RaBill, Role, ScheduleVariance,
    CURRENT_SCHEMA_VERSION,
};

use crate::{
    approval_router::{ApprovalRouter, EngineSettings},
    bill_calculator::BillCalculator,
    boq_ledger::BoqLedger,
    execution_workflow::ExecutionWorkflow,
    notify::NotificationSink,
    progress_aggregator::ProgressAggregator,
    time::Clock,
    CoreError,
};

#[derive(Default)]
struct Directory {
    projects: Vec<Project>,
    actors: Vec<Actor>,
    fund_heads: Vec<FundHead>,
    budget_lines: Vec<BudgetLineItem>,
    milestones: Vec<Milestone>,
}

struct BookMeta {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

/// Entry point for every billing and progress operation.
pub struct WorksEngine {
    meta: RwLock<BookMeta>,
    directory: RwLock<Directory>,
    ledger: Arc<BoqLedger>,
    executions: ExecutionWorkflow,
    router: ApprovalRouter,
    progress: ProgressAggregator,
    bill_guard: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl WorksEngine {
    pub fn new(
        name: impl Into<String>,
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let ledger = Arc::new(BoqLedger::new());
        let now = clock.now();
        Self {
            meta: RwLock::new(BookMeta {
                id: Uuid::new_v4(),
                name: name.into(),
                created_at: now,
            }),
            directory: RwLock::new(Directory::default()),
            executions: ExecutionWorkflow::new(
                Arc::clone(&ledger),
                Arc::clone(&clock),
                Arc::clone(&notifier),
            ),
            router: ApprovalRouter::new(settings, Arc::clone(&clock), notifier),
            ledger,
            progress: ProgressAggregator::new(),
            bill_guard: Mutex::new(()),
            clock,
        }
    }

    /// Rebuilds an engine from a persisted book.
    ///
    /// Running totals are recomputed from VERIFIED executions; a stored balance
    /// that disagrees is logged and replaced.
    pub fn from_book(
        book: ProjectBook,
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, CoreError> {
        if book.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(CoreError::Storage(format!(
                "book schema version {} is newer than supported version {}",
                book.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        let engine = Self::new(book.name.clone(), settings, clock, notifier);
        {
            let mut meta = engine
                .meta
                .write()
                .map_err(|_| CoreError::poisoned("book"))?;
            meta.id = book.id;
            meta.created_at = book.created_at;
        }
        {
            let mut directory = engine
                .directory
                .write()
                .map_err(|_| CoreError::poisoned("directory"))?;
            directory.projects = book.projects;
            directory.actors = book.actors;
            directory.fund_heads = book.fund_heads;
            directory.budget_lines = book.budget_lines;
            directory.milestones = book.milestones;
        }
        for item in book.boq_items {
            engine.ledger.register_item(item)?;
        }

        let mut derived: HashMap<Uuid, Decimal> = HashMap::new();
        for execution in book.executions {
            if execution.status == ExecutionStatus::Verified {
                *derived.entry(execution.boq_item_id).or_default() += execution.executed_quantity;
            }
            engine.executions.restore(execution)?;
        }
        for balance in &book.balances {
            let expected = derived
                .get(&balance.boq_item_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if expected != balance.verified_quantity {
                tracing::warn!(
                    item = %balance.boq_item_id,
                    stored = %balance.verified_quantity,
                    derived = %expected,
                    "stored ledger balance disagrees with verified executions"
                );
            }
        }
        for (boq_item_id, verified_quantity) in derived {
            engine
                .ledger
                .restore_balance(worksbill_domain::LedgerBalance {
                    boq_item_id,
                    verified_quantity,
                })?;
        }

        for bill in book.bills {
            engine.router.restore_bill(bill)?;
        }
        for request in book.approvals {
            engine.router.restore_request(request)?;
        }
        engine.progress.restore(book.progress_history)?;
        tracing::info!(book = %book.id, "project book loaded");
        Ok(engine)
    }

    pub fn to_book(&self) -> Result<ProjectBook, CoreError> {
        let meta = self.meta.read().map_err(|_| CoreError::poisoned("book"))?;
        let directory = self
            .directory
            .read()
            .map_err(|_| CoreError::poisoned("directory"))?;
        Ok(ProjectBook {
            id: meta.id,
            name: meta.name.clone(),
            projects: directory.projects.clone(),
            actors: directory.actors.clone(),
            boq_items: self.ledger.items()?,
            balances: self.ledger.balances()?,
            executions: self.executions.list()?,
            bills: self.router.all_bills()?,
            approvals: self.router.requests()?,
            fund_heads: directory.fund_heads.clone(),
            budget_lines: directory.budget_lines.clone(),
            milestones: directory.milestones.clone(),
            progress_history: self.progress.all()?,
            created_at: meta.created_at,
            updated_at: self.clock.now(),
            schema_version: CURRENT_SCHEMA_VERSION,
        })
    }

    pub fn name(&self) -> String {
        self.meta
            .read()
            .map(|meta| meta.name.clone())
            .unwrap_or_default()
    }

    pub fn settings(&self) -> EngineSettings {
        self.router.settings()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn add_project(
        &self,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Project, CoreError> {
        let (code, name): (String, String) = (code.into(), name.into());
        let project = Project::new(code.trim(), name.trim());
        if project.code.is_empty() || project.name.is_empty() {
            return Err(CoreError::Validation(
                "project code and name are required".into(),
            ));
        }
        let mut directory = self.directory_mut()?;
        if directory
            .projects
            .iter()
            .any(|existing| existing.code.eq_ignore_ascii_case(&project.code))
        {
            return Err(CoreError::Validation(format!(
                "project code {} already exists",
                project.code
            )));
        }
        directory.projects.push(project.clone());
        tracing::info!(project = %project.code, "project added");
        Ok(project)
    }

    pub fn projects(&self) -> Result<Vec<Project>, CoreError> {
        Ok(self.directory()?.projects.clone())
    }

    pub fn project(&self, id: Uuid) -> Result<Project, CoreError> {
        self.directory()?
            .projects
            .iter()
            .find(|project| project.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("project", id))
    }

    pub fn add_actor(&self, name: impl Into<String>, role: Role) -> Result<Actor, CoreError> {
        let name: String = name.into();
        let actor = Actor::new(name.trim(), role);
        if actor.name.is_empty() {
            return Err(CoreError::Validation("actor name is required".into()));
        }
        let mut directory = self.directory_mut()?;
        if directory
            .actors
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&actor.name))
        {
            return Err(CoreError::Validation(format!(
                "actor {} already exists",
                actor.name
            )));
        }
        directory.actors.push(actor.clone());
        Ok(actor)
    }

    pub fn actors(&self) -> Result<Vec<Actor>, CoreError> {
        Ok(self.directory()?.actors.clone())
    }

    pub fn actor(&self, id: Uuid) -> Result<Actor, CoreError> {
        self.directory()?
            .actors
            .iter()
            .find(|actor| actor.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("actor", id))
    }

    pub fn add_fund_head(
        &self,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<FundHead, CoreError> {
        let (code, name): (String, String) = (code.into(), name.into());
        let fund = FundHead::new(code.trim(), name.trim());
        if fund.code.is_empty() {
            return Err(CoreError::Validation("fund head code is required".into()));
        }
        let mut directory = self.directory_mut()?;
        if directory
            .fund_heads
            .iter()
            .any(|existing| existing.code.eq_ignore_ascii_case(&fund.code))
        {
            return Err(CoreError::Validation(format!(
                "fund head {} already exists",
                fund.code
            )));
        }
        directory.fund_heads.push(fund.clone());
        Ok(fund)
    }

    pub fn fund_heads(&self) -> Result<Vec<FundHead>, CoreError> {
        Ok(self.directory()?.fund_heads.clone())
    }

    pub fn allocate(&self, line: BudgetLineItem) -> Result<BudgetLineItem, CoreError> {
        if line.allocated_amount < Decimal::ZERO {
            return Err(CoreError::Validation(
                "allocated_amount must not be negative".into(),
            ));
        }
        let mut directory = self.directory_mut()?;
        if !directory.fund_heads.iter().any(|f| f.id == line.fund_head_id) {
            return Err(CoreError::not_found("fund head", line.fund_head_id));
        }
        if !directory.projects.iter().any(|p| p.id == line.project_id) {
            return Err(CoreError::not_found("project", line.project_id));
        }
        directory.budget_lines.push(line.clone());
        Ok(line)
    }

    pub fn budget_lines(&self, project_id: Uuid) -> Result<Vec<BudgetLineItem>, CoreError> {
        Ok(self
            .directory()?
            .budget_lines
            .iter()
            .filter(|line| line.project_id == project_id)
            .cloned()
            .collect())
    }

    pub fn add_milestone(&self, milestone: Milestone) -> Result<Milestone, CoreError> {
        if milestone.planned_start > milestone.planned_end {
            return Err(CoreError::Validation(
                "planned_start must not be after planned_end".into(),
            ));
        }
        if let Some(item_id) = milestone.boq_item_id {
            let item = self.ledger.item(item_id)?;
            if item.project_id != milestone.project_id {
                return Err(CoreError::Validation(
                    "milestone and BOQ item belong to different projects".into(),
                ));
            }
        }
        let mut directory = self.directory_mut()?;
        if !directory.projects.iter().any(|p| p.id == milestone.project_id) {
            return Err(CoreError::not_found("project", milestone.project_id));
        }
        directory.milestones.push(milestone.clone());
        Ok(milestone)
    }

    pub fn milestones(&self, project_id: Uuid) -> Result<Vec<Milestone>, CoreError> {
        let mut milestones: Vec<Milestone> = self
            .directory()?
            .milestones
            .iter()
            .filter(|milestone| milestone.project_id == project_id)
            .cloned()
            .collect();
        milestones.sort_by_key(|milestone| milestone.planned_start);
        Ok(milestones)
    }

    pub fn add_boq_item(&self, item: BoqItem) -> Result<BoqItem, CoreError> {
        self.check_item_refs(&item)?;
        if self
            .ledger
            .project_rows(item.project_id)?
            .iter()
            .any(|(existing, _)| existing.code == item.code)
        {
            return Err(CoreError::Validation(format!(
                "BOQ item {} already exists in the project",
                item.code
            )));
        }
        self.ledger.register_item(item.clone())?;
        tracing::info!(item = %item.code, "BOQ item added");
        Ok(item)
    }

    pub fn revise_boq_item(&self, item: BoqItem) -> Result<BoqItem, CoreError> {
        self.check_item_refs(&item)?;
        self.ledger.revise_item(item.clone())?;
        Ok(item)
    }

    pub fn boq_item(&self, id: Uuid) -> Result<BoqItem, CoreError> {
        self.ledger.item(id)
    }

    pub fn boq_items(&self, project_id: Uuid) -> Result<Vec<(BoqItem, Decimal)>, CoreError> {
        self.project(project_id)?;
        self.ledger.project_rows(project_id)
    }

    pub fn verified_quantity(&self, boq_item_id: Uuid) -> Result<Decimal, CoreError> {
        self.ledger.verified_quantity(boq_item_id)
    }

    pub fn create_execution(
        &self,
        actor: &Actor,
        draft: ExecutionDraft,
    ) -> Result<Execution, CoreError> {
        self.executions.create(actor, draft)
    }

    pub fn update_execution(
        &self,
        id: Uuid,
        actor: &Actor,
        draft: ExecutionDraft,
    ) -> Result<Execution, CoreError> {
        self.executions.update(id, actor, draft)
    }

    pub fn delete_execution(&self, id: Uuid, actor: &Actor) -> Result<(), CoreError> {
        self.executions.delete(id, actor).map(|_| ())
    }

    pub fn submit_execution(&self, id: Uuid, actor: &Actor) -> Result<Execution, CoreError> {
        self.executions.submit(id, actor)
    }

    /// Verifies an execution, then records a progress snapshot for its project.
    ///
    /// Once the VERIFIED status and the ledger increment have committed the call
    /// succeeds; a failure in the follow-up bookkeeping is logged, not returned.
    pub fn verify_execution(&self, id: Uuid, actor: &Actor) -> Result<Execution, CoreError> {
        let execution = self.executions.verify(id, actor)?;
        if let Err(err) = self.after_verification(&execution, actor) {
            tracing::error!(execution = %execution.id, error = %err, "post-verification bookkeeping failed");
        }
        Ok(execution)
    }

    fn after_verification(&self, execution: &Execution, actor: &Actor) -> Result<(), CoreError> {
        let item = self.ledger.item(execution.boq_item_id)?;
        let report = self.project_report(item.project_id)?;
        self.progress.record(
            item.project_id,
            execution.id,
            item.id,
            report.percentage,
            self.clock.now(),
        )?;

        let overrun = execution
            .ledger_effect
            .map(|effect| effect.overrun)
            .unwrap_or(false);
        if !(overrun && self.settings().open_overrun_requests) {
            return Ok(());
        }
        match self.router.open_request(
            ApprovalSubject::QuantityOverrun(item.id),
            format!(
                "item {} verified beyond sanctioned quantity {}",
                item.code, item.sanctioned_quantity
            ),
            actor,
        ) {
            Ok(_) => Ok(()),
            Err(err) if err.is_conflict() => {
                tracing::debug!(item = %item.code, "overrun request already pending");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub fn reject_execution(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Execution, CoreError> {
        self.executions.reject(id, actor, reason)
    }

    pub fn request_revision(
        &self,
        id: Uuid,
        actor: &Actor,
        note: impl Into<String>,
    ) -> Result<Execution, CoreError> {
        self.executions.request_revision(id, actor, note)
    }

    pub fn execution(&self, id: Uuid) -> Result<Execution, CoreError> {
        self.executions.get(id)
    }

    pub fn executions(&self) -> Result<Vec<Execution>, CoreError> {
        self.executions.list()
    }

    pub fn calculate_etp(&self, input: &EtpInput) -> Result<BillSummary, CoreError> {
        BillCalculator::calculate_etp(input, self.settings().gst_treatment)
    }

    /// Value of work verified since the project's latest bill.
    pub fn suggest_gross(&self, project_id: Uuid) -> Result<Decimal, CoreError> {
        let rows = self.boq_items(project_id)?;
        let bills = self.router.bills_for_project(project_id)?;
        Ok(BillCalculator::gross_from_ledger(&rows, bills.last()))
    }

    pub fn create_bill(
        &self,
        project_id: Uuid,
        actor: &Actor,
        draft: BillDraft,
    ) -> Result<RaBill, CoreError> {
        if !(actor.has_role(Role::Submitter) || actor.has_role(Role::Accounts)) {
            return Err(CoreError::Unauthorized(format!(
                "{} cannot raise bills",
                actor.role
            )));
        }
        self.project(project_id)?;
        let bill_number = draft.bill_number.trim().to_string();
        if bill_number.is_empty() {
            return Err(CoreError::Validation("bill number is required".into()));
        }
        let summary = self.calculate_etp(&draft.input)?;

        let _guard = self
            .bill_guard
            .lock()
            .map_err(|_| CoreError::poisoned("bills"))?;
        let existing = self.router.bills_for_project(project_id)?;
        if existing.iter().any(|bill| bill.bill_number == bill_number) {
            return Err(CoreError::Validation(format!(
                "bill number {bill_number} already used in this project"
            )));
        }
        if let Some(fund_head_id) = draft.fund_head_id {
            self.check_allocation(fund_head_id, project_id, summary.gross_amount, None)?;
        }
        let snapshot = self
            .ledger
            .project_rows(project_id)?
            .into_iter()
            .map(|(item, verified)| worksbill_domain::LedgerBalance {
                boq_item_id: item.id,
                verified_quantity: verified,
            })
            .collect();
        let now = self.clock.now();
        self.router.register_bill(RaBill {
            id: Uuid::new_v4(),
            project_id,
            bill_number,
            fund_head_id: draft.fund_head_id,
            input: draft.input,
            summary,
            status: BillStatus::Draft,
            ledger_snapshot: snapshot,
            created_by: actor.id,
            created_at: now,
            updated_at: now,
            verified_by: None,
            verified_at: None,
            paid_by: None,
            paid_at: None,
            version: 0,
        })
    }

    pub fn update_bill(
        &self,
        id: Uuid,
        actor: &Actor,
        draft: BillDraft,
    ) -> Result<RaBill, CoreError> {
        let bill_number = draft.bill_number.trim().to_string();
        if bill_number.is_empty() {
            return Err(CoreError::Validation("bill number is required".into()));
        }
        let summary = self.calculate_etp(&draft.input)?;
        let _guard = self
            .bill_guard
            .lock()
            .map_err(|_| CoreError::poisoned("bills"))?;
        let current = self.router.bill(id)?;
        if self
            .router
            .bills_for_project(current.project_id)?
            .iter()
            .any(|bill| bill.id != id && bill.bill_number == bill_number)
        {
            return Err(CoreError::Validation(format!(
                "bill number {bill_number} already used in this project"
            )));
        }
        if let Some(fund_head_id) = draft.fund_head_id {
            self.check_allocation(
                fund_head_id,
                current.project_id,
                summary.gross_amount,
                Some(id),
            )?;
        }
        self.router.update_bill_draft(id, actor, |bill| {
            bill.bill_number = bill_number;
            bill.fund_head_id = draft.fund_head_id;
            bill.input = draft.input;
            bill.summary = summary;
            Ok(())
        })
    }

    pub fn verify_bill(&self, id: Uuid, actor: &Actor) -> Result<RaBill, CoreError> {
        self.router.verify_bill(id, actor)
    }

    pub fn pay_bill(&self, id: Uuid, actor: &Actor) -> Result<RaBill, CoreError> {
        self.router.pay_bill(id, actor)
    }

    pub fn bill(&self, id: Uuid) -> Result<RaBill, CoreError> {
        self.router.bill(id)
    }

    pub fn bills(&self, project_id: Uuid) -> Result<Vec<RaBill>, CoreError> {
        self.router.bills_for_project(project_id)
    }

    pub fn allocation_headroom(
        &self,
        fund_head_id: Uuid,
        project_id: Uuid,
    ) -> Result<Decimal, CoreError> {
        let lines = self.budget_lines(project_id)?;
        let bills = self.router.all_bills()?;
        Ok(BillCalculator::allocation_headroom(
            fund_head_id,
            project_id,
            &lines,
            &bills,
            None,
        ))
    }

    pub fn open_request(
        &self,
        subject: ApprovalSubject,
        notes: impl Into<String>,
        actor: &Actor,
    ) -> Result<ApprovalRequest, CoreError> {
        self.router.open_request(subject, notes, actor)
    }

    pub fn approve_request(
        &self,
        id: Uuid,
        actor: &Actor,
        notes: impl Into<String>,
    ) -> Result<ApprovalRequest, CoreError> {
        self.router.approve(id, actor, notes)
    }

    pub fn reject_request(
        &self,
        id: Uuid,
        actor: &Actor,
        notes: impl Into<String>,
    ) -> Result<ApprovalRequest, CoreError> {
        self.router.reject(id, actor, notes)
    }

    pub fn requests(&self) -> Result<Vec<ApprovalRequest>, CoreError> {
        self.router.requests()
    }

    pub fn router(&self) -> &ApprovalRouter {
        &self.router
    }

    pub fn project_progress(&self, project_id: Uuid) -> Result<ProgressReport, CoreError> {
        self.project(project_id)?;
        self.project_report(project_id)
    }

    pub fn schedule_variance(
        &self,
        project_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<ScheduleVariance, CoreError> {
        let report = self.project_progress(project_id)?;
        let milestones = self.milestones(project_id)?;
        Ok(ProgressAggregator::schedule_variance(
            &report,
            &milestones,
            as_of,
        ))
    }

    pub fn history(&self, project_id: Uuid) -> Result<Vec<ProgressSnapshot>, CoreError> {
        self.project(project_id)?;
        self.progress.history(project_id)
    }

    fn project_report(&self, project_id: Uuid) -> Result<ProgressReport, CoreError> {
        let rows = self.ledger.project_rows(project_id)?;
        Ok(ProgressAggregator::project_progress(project_id, &rows))
    }

    fn check_allocation(
        &self,
        fund_head_id: Uuid,
        project_id: Uuid,
        gross: Decimal,
        excluding: Option<Uuid>,
    ) -> Result<Decimal, CoreError> {
        let directory = self.directory()?;
        if !directory.fund_heads.iter().any(|f| f.id == fund_head_id) {
            return Err(CoreError::not_found("fund head", fund_head_id));
        }
        let lines = directory.budget_lines.clone();
        drop(directory);
        let bills = self.router.all_bills()?;
        BillCalculator::check_allocation(fund_head_id, project_id, gross, &lines, &bills, excluding)
    }

    fn check_item_refs(&self, item: &BoqItem) -> Result<(), CoreError> {
        let directory = self.directory()?;
        if !directory.projects.iter().any(|p| p.id == item.project_id) {
            return Err(CoreError::not_found("project", item.project_id));
        }
        if let Some(fund) = item.fund_head_id {
            if !directory.fund_heads.iter().any(|f| f.id == fund) {
                return Err(CoreError::not_found("fund head", fund));
            }
        }
        Ok(())
    }

    fn directory(&self) -> Result<std::sync::RwLockReadGuard<'_, Directory>, CoreError> {
        self.directory
            .read()
            .map_err(|_| CoreError::poisoned("directory"))
    }

    fn directory_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, Directory>, CoreError> {
        self.directory
            .write()
            .map_err(|_| CoreError::poisoned("directory"))
    }
}

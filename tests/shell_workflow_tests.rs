mod common;

use std::str::FromStr;

use common::{run, setup_shell, SITE_SETUP};
use rust_decimal::Decimal;
use worksbill::cli::core::CommandError;
use worksbill::cli::shell_context::ShellContext;
use worksbill_core::CoreError;
use worksbill_domain::{BillStatus, ExecutionStatus};

fn d(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// Short id of the execution still in draft.
fn latest_execution(context: &ShellContext) -> String {
    let executions = context.engine.executions().unwrap();
    let draft = executions
        .iter()
        .find(|execution| execution.status == ExecutionStatus::Draft)
        .unwrap();
    draft.id.simple().to_string()[..8].to_string()
}

fn record_and_verify(context: &mut ShellContext, quantity: &str) -> String {
    run(context, &["actor use Engineer"]);
    run(
        context,
        &[format!("exec add E-1 {quantity} 2025-05-31 2025-05-01 2025-05-31").as_str()],
    );
    let id = latest_execution(context);
    run(
        context,
        &[
            format!("exec submit {id}").as_str(),
            "actor use Checker",
            format!("exec verify {id}").as_str(),
        ],
    );
    id
}

#[test]
fn verified_quantities_accumulate_and_flag_overruns() {
    let (mut context, _) = setup_shell();
    run(&mut context, SITE_SETUP);

    record_and_verify(&mut context, "60");
    record_and_verify(&mut context, "50");

    let item = context.find_boq_item("E-1").unwrap();
    assert_eq!(context.engine.verified_quantity(item.id).unwrap(), d("110"));

    let project = context.project().unwrap();
    let report = context.engine.project_progress(project.id).unwrap();
    assert_eq!(report.overrun_items().count(), 1);
    assert_eq!(context.engine.history(project.id).unwrap().len(), 2);
    run(&mut context, &["progress", "history", "exec list verified"]);
}

#[test]
fn roles_gate_each_workflow_step() {
    let (mut context, _) = setup_shell();
    run(&mut context, SITE_SETUP);

    run(&mut context, &["actor use Checker"]);
    let err = context
        .process_line("exec add E-1 10 2025-05-31")
        .unwrap_err();
    assert!(matches!(err, CommandError::Core(CoreError::Unauthorized(_))));

    run(&mut context, &["actor use Engineer", "exec add E-1 10 2025-05-31"]);
    let id = latest_execution(&context);
    run(&mut context, &[format!("exec submit {id}").as_str()]);
    let err = context.process_line(&format!("exec verify {id}")).unwrap_err();
    assert!(matches!(err, CommandError::Core(CoreError::Unauthorized(_))));

    run(&mut context, &["actor use Checker"]);
    run(&mut context, &[format!("exec reject {id} wrong chainage").as_str()]);
    let rejected = context.find_execution(&id).unwrap();
    assert_eq!(rejected.status, ExecutionStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("wrong chainage"));
}

#[test]
fn verifying_twice_reports_an_invalid_transition() {
    let (mut context, _) = setup_shell();
    run(&mut context, SITE_SETUP);
    let id = record_and_verify(&mut context, "10");

    let err = context.process_line(&format!("exec verify {id}")).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Core(CoreError::InvalidStateTransition { .. })
    ));
    let item = context.find_boq_item("E-1").unwrap();
    assert_eq!(context.engine.verified_quantity(item.id).unwrap(), d("10"));
}

#[test]
fn bills_move_from_draft_to_paid() {
    let (mut context, _) = setup_shell();
    run(&mut context, SITE_SETUP);
    record_and_verify(&mut context, "40");

    run(
        &mut context,
        &[
            "actor use Accounts",
            "bill add RA-1 auto - - - - MH-5054",
            "bill verify RA-1",
            "bill pay RA-1",
        ],
    );
    let bill = context.find_bill("RA-1").unwrap();
    assert_eq!(bill.status, BillStatus::Paid);
    assert_eq!(bill.summary.gross_amount, d("40000.00"));
    assert_eq!(bill.summary.retention_amount, d("2000.00"));
    assert_eq!(bill.summary.net_payable, d("38000.00"));

    let err = context.process_line("bill pay RA-1").unwrap_err();
    assert!(matches!(
        err,
        CommandError::Core(CoreError::InvalidStateTransition { .. })
    ));

    record_and_verify(&mut context, "10");
    let project = context.project().unwrap();
    assert_eq!(context.engine.suggest_gross(project.id).unwrap(), d("10000.00"));
}

#[test]
fn payment_waits_for_approval_when_configured() {
    let (mut context, _) = setup_shell();
    run(&mut context, SITE_SETUP);
    run(&mut context, &["config set payment_requires_approval true"]);
    assert!(context.engine.settings().payment_requires_approval);

    record_and_verify(&mut context, "20");
    run(
        &mut context,
        &["actor use Accounts", "bill add RA-1 20000", "bill verify RA-1"],
    );
    let err = context.process_line("bill pay RA-1").unwrap_err();
    assert!(matches!(err, CommandError::Core(CoreError::Validation(_))));

    run(&mut context, &["request open bill RA-1 release first bill"]);
    let request = context.engine.requests().unwrap().remove(0);
    let token = request.id.simple().to_string()[..8].to_string();
    run(
        &mut context,
        &[
            "actor use Approver",
            format!("request approve {token} cleared").as_str(),
            "actor use Accounts",
            "bill pay RA-1",
        ],
    );
    assert_eq!(context.find_bill("RA-1").unwrap().status, BillStatus::Paid);

    run(&mut context, &["actor use Approver"]);
    let err = context
        .process_line(&format!("request reject {token}"))
        .unwrap_err();
    assert!(matches!(err, CommandError::Core(CoreError::Conflict(_))));
}

#[test]
fn books_survive_save_and_reload() {
    let (mut context, base) = setup_shell();
    run(&mut context, SITE_SETUP);
    record_and_verify(&mut context, "25");
    run(&mut context, &["book save district-works", "book backup before reset"]);

    run(&mut context, &["book new Scratch"]);
    assert!(context.engine.projects().unwrap().is_empty());
    assert!(context.book_name.is_none());

    run(&mut context, &["book load district-works"]);
    let item = context.find_boq_item("E-1").unwrap();
    assert_eq!(context.engine.verified_quantity(item.id).unwrap(), d("25"));
    assert_eq!(context.config.last_opened_book.as_deref(), Some("district-works"));

    let export = base.join("export.json");
    run(&mut context, &[format!("book export {}", export.display()).as_str()]);
    run(&mut context, &[format!("book import {}", export.display()).as_str()]);
    assert_eq!(context.engine.projects().unwrap().len(), 1);
    assert!(context.book_name.is_none());
}

#[test]
fn backups_restore_earlier_state() {
    let (mut context, _) = setup_shell();
    run(&mut context, SITE_SETUP);
    run(&mut context, &["book save works", "book backup baseline"]);
    record_and_verify(&mut context, "30");

    let backups = context.storage.list_backup_metadata("works").unwrap();
    assert_eq!(backups.len(), 1);
    let name = backups[0].name.clone();
    let token = name.trim_end_matches(".json").to_string();
    run(&mut context, &[format!("book restore {token}").as_str()]);

    let item = context.find_boq_item("E-1").unwrap();
    assert_eq!(context.engine.verified_quantity(item.id).unwrap(), Decimal::ZERO);
}

#[test]
fn unknown_commands_and_bad_arguments_do_not_stop_the_shell() {
    let (mut context, _) = setup_shell();
    assert!(context.process_line("projct list").is_ok());
    assert!(context.process_line("").is_ok());

    let err = context.process_line("etp lots").unwrap_err();
    assert!(matches!(err, CommandError::InvalidArguments(_)));
    let err = context.process_line("exec list").unwrap_err();
    assert!(matches!(err, CommandError::ProjectNotSelected));
    let err = context.process_line("etp 100 101").unwrap_err();
    assert!(matches!(
        err,
        CommandError::Core(CoreError::InvalidCalculationInput(_))
    ));
    assert!(context.running);
}

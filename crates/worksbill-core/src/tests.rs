use std::{
    str::FromStr,
    sync::{Arc, Barrier},
    thread,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    approval_router::EngineSettings,
    notify::RecordingNotifier, time::ManualClock, CoreError, NotificationKind, WorksEngine,
};
use worksbill_domain::{
    Actor, ApprovalStatus, ApprovalSubject, BillDraft, BillStatus, BoqItem, BudgetLineItem,
    EtpInput, ExecutionDraft, ExecutionStatus, Milestone, Project, Role,
};

struct Site {
    engine: WorksEngine,
    notifier: Arc<RecordingNotifier>,
    project: Project,
    engineer: Actor,
    verifier: Actor,
    accounts: Actor,
    approver: Actor,
}

fn d(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn site(settings: EngineSettings) -> Site {
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::at_date(date(2025, 6, 1)));
    let engine = WorksEngine::new("District works", settings, clock, notifier.clone());
    let project = engine.add_project("RD-07", "Village link road").unwrap();
    Site {
        engineer: engine.add_actor("Junior engineer", Role::Submitter).unwrap(),
        verifier: engine.add_actor("Assistant engineer", Role::Verifier).unwrap(),
        accounts: engine.add_actor("Divisional accountant", Role::Accounts).unwrap(),
        approver: engine.add_actor("Executive engineer", Role::Approver).unwrap(),
        engine,
        notifier,
        project,
    }
}

fn add_item(site: &Site, code: &str, sanctioned: &str, rate: &str) -> BoqItem {
    site.engine
        .add_boq_item(BoqItem::new(
            site.project.id,
            code,
            format!("Item {code}"),
            "cum",
            d(sanctioned),
            d(rate),
        ))
        .unwrap()
}

fn draft(item: &BoqItem, quantity: &str) -> ExecutionDraft {
    ExecutionDraft {
        boq_item_id: item.id,
        executed_quantity: d(quantity),
        execution_date: date(2025, 5, 31),
        period_from: date(2025, 5, 1),
        period_to: date(2025, 5, 31),
        remarks: String::new(),
    }
}

fn verified(site: &Site, item: &BoqItem, quantity: &str) -> crate::CoreResult<worksbill_domain::Execution> {
    let exec = site.engine.create_execution(&site.engineer, draft(item, quantity))?;
    site.engine.submit_execution(exec.id, &site.engineer)?;
    site.engine.verify_execution(exec.id, &site.verifier)
}

#[test]
fn overrun_is_flagged_after_second_verification() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "1000", "100");

    let first = verified(&site, &item, "50").unwrap();
    let effect = first.ledger_effect.unwrap();
    assert_eq!(effect.new_total, d("50"));
    assert!(!effect.overrun);

    let second = verified(&site, &item, "960").unwrap();
    let effect = second.ledger_effect.unwrap();
    assert_eq!(effect.new_total, d("1010"));
    assert!(effect.overrun);
    assert_eq!(site.engine.verified_quantity(item.id).unwrap(), d("1010"));
    assert_eq!(site.notifier.count(NotificationKind::QuantityOverrun), 1);
    assert!(site.engine.requests().unwrap().is_empty());
}

#[test]
fn overrun_policy_opens_a_single_pending_request() {
    let site = site(EngineSettings {
        open_overrun_requests: true,
        ..EngineSettings::default()
    });
    let item = add_item(&site, "1.1", "10", "100");

    verified(&site, &item, "11").unwrap();
    verified(&site, &item, "2").unwrap();

    let requests = site.engine.requests().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].subject, ApprovalSubject::QuantityOverrun(item.id));
    assert_eq!(requests[0].status, ApprovalStatus::Pending);
    assert_eq!(site.engine.history(site.project.id).unwrap().len(), 2);
}

#[test]
fn verifying_twice_is_an_invalid_transition() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "1000", "100");
    let exec = verified(&site, &item, "10").unwrap();

    let err = site
        .engine
        .verify_execution(exec.id, &site.verifier)
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(site.engine.verified_quantity(item.id).unwrap(), d("10"));
}

#[test]
fn state_machine_rejects_every_undocumented_edge() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "1000", "100");

    let rejected = site.engine.create_execution(&site.engineer, draft(&item, "1")).unwrap();
    site.engine.submit_execution(rejected.id, &site.engineer).unwrap();
    site.engine
        .reject_execution(rejected.id, &site.verifier, "wrong chainage")
        .unwrap();

    let verified = verified(&site, &item, "1").unwrap();
    let drafted = site.engine.create_execution(&site.engineer, draft(&item, "1")).unwrap();

    for id in [rejected.id, verified.id] {
        let before = site.engine.execution(id).unwrap();
        assert!(site.engine.submit_execution(id, &site.engineer).unwrap_err().is_invalid_transition());
        assert!(site.engine.update_execution(id, &site.engineer, draft(&item, "2")).unwrap_err().is_invalid_transition());
        assert!(site.engine.delete_execution(id, &site.engineer).unwrap_err().is_invalid_transition());
        assert!(site.engine.request_revision(id, &site.verifier, "x").unwrap_err().is_invalid_transition());
        assert!(site.engine.reject_execution(id, &site.verifier, "x").unwrap_err().is_invalid_transition());
        assert_eq!(site.engine.execution(id).unwrap(), before);
    }
    assert!(site.engine.verify_execution(drafted.id, &site.verifier).unwrap_err().is_invalid_transition());
    assert!(site.engine.reject_execution(drafted.id, &site.verifier, "x").unwrap_err().is_invalid_transition());
    assert_eq!(site.engine.verified_quantity(item.id).unwrap(), d("1"));
}

#[test]
fn ledger_sum_is_independent_of_verification_order() {
    let quantities = ["12.5", "3", "40.25", "7", "0.75"];
    let mut totals = Vec::new();
    for reversed in [false, true] {
        let site = site(EngineSettings::default());
        let item = add_item(&site, "1.1", "50", "10");
        let ids: Vec<Uuid> = quantities
            .iter()
            .map(|q| {
                let exec = site.engine.create_execution(&site.engineer, draft(&item, q)).unwrap();
                site.engine.submit_execution(exec.id, &site.engineer).unwrap();
                exec.id
            })
            .collect();
        let order: Vec<Uuid> = if reversed {
            ids.into_iter().rev().collect()
        } else {
            ids
        };
        for id in order {
            site.engine.verify_execution(id, &site.verifier).unwrap();
        }
        totals.push(site.engine.verified_quantity(item.id).unwrap());
    }
    assert_eq!(totals[0], d("63.5"));
    assert_eq!(totals[0], totals[1]);
}

#[test]
fn concurrent_submits_yield_one_success_and_one_conflict() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "1000", "100");
    let engine = Arc::new(site.engine);

    for _ in 0..50 {
        let exec = engine.create_execution(&site.engineer, draft(&item, "5")).unwrap();
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                let actor = site.engineer.clone();
                thread::spawn(move || {
                    barrier.wait();
                    engine.submit_execution(exec.id, &actor)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CoreError::Conflict(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(
            engine.execution(exec.id).unwrap().status,
            ExecutionStatus::Submitted
        );
    }
}

#[test]
fn concurrent_verifications_of_one_record_apply_the_delta_once() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "1000", "100");
    let exec = site.engine.create_execution(&site.engineer, draft(&item, "25")).unwrap();
    site.engine.submit_execution(exec.id, &site.engineer).unwrap();

    let engine = Arc::new(site.engine);
    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let verifier = site.verifier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.verify_execution(exec.id, &verifier)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(err.is_conflict() || err.is_invalid_transition(), "{err}");
    }
    assert_eq!(engine.verified_quantity(item.id).unwrap(), d("25"));
}

#[test]
fn concurrent_verifications_across_records_lose_no_increments() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "100", "100");
    let ids: Vec<Uuid> = (0..16)
        .map(|_| {
            let exec = site.engine.create_execution(&site.engineer, draft(&item, "1.5")).unwrap();
            site.engine.submit_execution(exec.id, &site.engineer).unwrap();
            exec.id
        })
        .collect();

    let engine = Arc::new(site.engine);
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let engine = Arc::clone(&engine);
            let verifier = site.verifier.clone();
            thread::spawn(move || engine.verify_execution(id, &verifier))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(engine.verified_quantity(item.id).unwrap(), d("24"));
    assert_eq!(engine.history(site.project.id).unwrap().len(), 16);
}

#[test]
fn project_progress_weights_by_value() {
    let site = site(EngineSettings::default());
    let a = add_item(&site, "A", "100", "10");
    add_item(&site, "B", "200", "5");
    verified(&site, &a, "50").unwrap();

    let report = site.engine.project_progress(site.project.id).unwrap();
    assert_eq!(report.percentage, d("25"));
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[0].percentage, d("50"));

    let missing = site.engine.project_progress(Uuid::new_v4()).unwrap_err();
    assert!(matches!(missing, CoreError::NotFound { .. }));
}

#[test]
fn schedule_variance_uses_milestones() {
    let site = site(EngineSettings::default());
    let a = add_item(&site, "A", "100", "10");
    verified(&site, &a, "20").unwrap();
    site.engine
        .add_milestone(Milestone::new(
            site.project.id,
            "Formation",
            date(2025, 5, 1),
            date(2025, 5, 31),
        ))
        .unwrap();

    let variance = site
        .engine
        .schedule_variance(site.project.id, date(2025, 5, 16))
        .unwrap();
    assert_eq!(variance.actual, d("20"));
    assert_eq!(variance.expected, d("50"));
    assert_eq!(variance.variance, d("-30"));
}

#[test]
fn history_records_each_verification_in_order() {
    let site = site(EngineSettings::default());
    let a = add_item(&site, "A", "100", "10");
    verified(&site, &a, "10").unwrap();
    verified(&site, &a, "30").unwrap();

    let history = site.engine.history(site.project.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].percentage, d("10"));
    assert_eq!(history[1].percentage, d("40"));
    assert!(history[0].sequence < history[1].sequence);
}

#[test]
fn bill_lifecycle_with_allocation_and_ledger_snapshot() {
    let site = site(EngineSettings::default());
    let fund = site.engine.add_fund_head("5054", "Roads and bridges").unwrap();
    site.engine
        .allocate(BudgetLineItem::new(fund.id, site.project.id, "2025-26", d("150000")))
        .unwrap();
    let item = add_item(&site, "1.1", "1000", "100");
    verified(&site, &item, "1000").unwrap();

    assert_eq!(site.engine.suggest_gross(site.project.id).unwrap(), d("100000"));
    let bill = site
        .engine
        .create_bill(
            site.project.id,
            &site.engineer,
            BillDraft {
                bill_number: "RA-1".into(),
                fund_head_id: Some(fund.id),
                input: EtpInput::new(d("100000"), d("18"), d("5"), d("0"), d("0")),
            },
        )
        .unwrap();
    assert_eq!(bill.summary.net_payable, d("95000"));
    assert_eq!(bill.snapshot_quantity(item.id), d("1000"));
    assert_eq!(site.engine.suggest_gross(site.project.id).unwrap(), d("0"));
    assert_eq!(
        site.engine.allocation_headroom(fund.id, site.project.id).unwrap(),
        d("50000")
    );

    let too_big = site.engine.create_bill(
        site.project.id,
        &site.engineer,
        BillDraft {
            bill_number: "RA-2".into(),
            fund_head_id: Some(fund.id),
            input: EtpInput::new(d("60000"), d("0"), d("0"), d("0"), d("0")),
        },
    );
    assert!(matches!(too_big, Err(CoreError::Validation(_))));

    site.engine.verify_bill(bill.id, &site.verifier).unwrap();
    let paid = site.engine.pay_bill(bill.id, &site.accounts).unwrap();
    assert_eq!(paid.status, BillStatus::Paid);
    let frozen = site.engine.update_bill(
        bill.id,
        &site.engineer,
        BillDraft {
            bill_number: "RA-1".into(),
            fund_head_id: None,
            input: EtpInput::new(d("1"), d("0"), d("0"), d("0"), d("0")),
        },
    );
    assert!(frozen.unwrap_err().is_invalid_transition());
}

#[test]
fn allocation_is_consumed_only_by_bills_of_the_same_project() {
    let site = site(EngineSettings::default());
    let other = site.engine.add_project("RD-09", "Culvert at km 4").unwrap();
    let fund = site.engine.add_fund_head("5054", "Roads and bridges").unwrap();
    for project in [site.project.id, other.id] {
        site.engine
            .allocate(BudgetLineItem::new(fund.id, project, "2025-26", d("50000")))
            .unwrap();
    }
    let bill = |project: Uuid, number: &str, gross: &str| {
        site.engine.create_bill(
            project,
            &site.accounts,
            BillDraft {
                bill_number: number.into(),
                fund_head_id: Some(fund.id),
                input: EtpInput::new(d(gross), d("0"), d("0"), d("0"), d("0")),
            },
        )
    };

    bill(other.id, "RA-1", "40000").unwrap();
    assert_eq!(
        site.engine.allocation_headroom(fund.id, site.project.id).unwrap(),
        d("50000")
    );
    assert_eq!(
        site.engine.allocation_headroom(fund.id, other.id).unwrap(),
        d("10000")
    );

    bill(site.project.id, "RA-1", "20000").unwrap();
    assert!(matches!(
        bill(other.id, "RA-2", "20000"),
        Err(CoreError::Validation(_))
    ));
}

#[test]
fn approval_requests_decide_exactly_once() {
    let site = site(EngineSettings::default());
    let subject = ApprovalSubject::BudgetChange(Uuid::new_v4());
    let request = site
        .engine
        .open_request(subject.clone(), "revise estimate", &site.engineer)
        .unwrap();
    assert!(site
        .engine
        .open_request(subject, "again", &site.engineer)
        .unwrap_err()
        .is_conflict());
    site.engine
        .approve_request(request.id, &site.approver, "sanctioned")
        .unwrap();
    assert!(site
        .engine
        .reject_request(request.id, &site.approver, "")
        .unwrap_err()
        .is_conflict());
}

#[test]
fn book_round_trip_preserves_state() {
    let site = site(EngineSettings::default());
    let item = add_item(&site, "1.1", "1000", "100");
    verified(&site, &item, "120").unwrap();
    let pending = site.engine.create_execution(&site.engineer, draft(&item, "3")).unwrap();

    let book = site.engine.to_book().unwrap();
    let restored = WorksEngine::from_book(
        book.clone(),
        EngineSettings::default(),
        Arc::new(ManualClock::at_date(date(2025, 6, 2))),
        Arc::new(RecordingNotifier::new()),
    )
    .unwrap();

    assert_eq!(restored.verified_quantity(item.id).unwrap(), d("120"));
    assert_eq!(restored.execution(pending.id).unwrap(), pending);
    assert_eq!(restored.history(site.project.id).unwrap().len(), 1);
    let again = restored.to_book().unwrap();
    assert_eq!(again.executions, book.executions);
    assert_eq!(again.balances, book.balances);
}

use std::sync::Arc;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use tempfile::tempdir;
use worksbill_core::{
    BoqLedger, EngineSettings, RecordingNotifier, SystemClock, WorksEngine,
};
use worksbill_domain::{BoqItem, EtpInput, ExecutionDraft, ProjectBook, Role};
use worksbill_storage_json::{load_book_from_path, save_book_to_path};

fn build_sample_book(item_count: usize) -> ProjectBook {
    let engine = WorksEngine::new(
        "Benchmark",
        EngineSettings::default(),
        Arc::new(SystemClock),
        Arc::new(RecordingNotifier::new()),
    );
    let project = engine.add_project("BM-01", "Benchmark highway").expect("project");
    let engineer = engine.add_actor("Engineer", Role::Submitter).expect("engineer");
    let checker = engine.add_actor("Checker", Role::Verifier).expect("checker");
    let date = NaiveDate::from_ymd_opt(2025, 5, 31).expect("date");

    for idx in 0..item_count {
        let item = engine
            .add_boq_item(BoqItem::new(
                project.id,
                format!("I-{idx}"),
                "Benchmark item",
                "cum",
                Decimal::from(1_000),
                Decimal::from(250 + (idx % 50) as i64),
            ))
            .expect("item");
        let exec = engine
            .create_execution(
                &engineer,
                ExecutionDraft {
                    boq_item_id: item.id,
                    executed_quantity: Decimal::from(10 + (idx % 40) as i64),
                    execution_date: date,
                    period_from: date,
                    period_to: date,
                    remarks: String::new(),
                },
            )
            .expect("execution");
        engine.submit_execution(exec.id, &engineer).expect("submit");
        engine.verify_execution(exec.id, &checker).expect("verify");
    }
    engine.to_book().expect("book")
}

fn bench_bill_calculation(c: &mut Criterion) {
    let engine = WorksEngine::new(
        "Benchmark",
        EngineSettings::default(),
        Arc::new(SystemClock),
        Arc::new(RecordingNotifier::new()),
    );
    let input = EtpInput::new(
        Decimal::new(1_234_567_89, 2),
        Decimal::from(18),
        Decimal::from(5),
        Decimal::from(2_500),
        Decimal::from(10_000),
    );
    c.bench_function("calculate_etp", |b| {
        b.iter(|| black_box(engine.calculate_etp(black_box(&input)).expect("etp")))
    });
}

fn bench_ledger_increments(c: &mut Criterion) {
    c.bench_function("record_verified_1k", |b| {
        b.iter_batched(
            || {
                let ledger = BoqLedger::new();
                let item = BoqItem::new(
                    uuid::Uuid::new_v4(),
                    "E-1",
                    "Earthwork",
                    "cum",
                    Decimal::from(500),
                    Decimal::from(250),
                );
                let id = item.id;
                ledger.register_item(item).expect("register");
                (ledger, id)
            },
            |(ledger, id)| {
                for _ in 0..1_000 {
                    black_box(ledger.record_verified(id, Decimal::ONE).expect("record"));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_book_io(c: &mut Criterion) {
    let book = build_sample_book(black_box(1_000));
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("book.json");

    c.bench_function("book_save_1k", |b| {
        b.iter(|| save_book_to_path(&book, &file_path).expect("save book"))
    });

    save_book_to_path(&book, &file_path).expect("seed");

    c.bench_function("book_load_1k", |b| {
        b.iter(|| black_box(load_book_from_path(&file_path).expect("load book")))
    });
}

criterion_group!(
    benches,
    bench_bill_calculation,
    bench_ledger_increments,
    bench_book_io
);
criterion_main!(benches);

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn script(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("worksbill_cli").unwrap();
    cmd.env("WORKSBILL_CLI_SCRIPT", "1")
        .env("WORKSBILL_HOME", home)
        .env_remove("WORKSBILL_QUIET");
    cmd
}

#[test]
fn script_mode_calculates_bill_deductions() {
    let home = common::data_dir();
    script(&home)
        .write_stdin("etp 100000\nexit\n")
        .assert()
        .success()
        .stdout(contains("=== Bill calculation ==="))
        .stdout(contains("Retention          : INR 5,000.00"))
        .stdout(contains("GST (informational): INR 18,000.00"))
        .stdout(contains("Net payable        : INR 95,000.00"));
}

#[test]
fn script_mode_records_work_and_saves_the_book() {
    let home = common::data_dir();
    let input = "\
# district works register
project add RD-07 \"Village link road\"
actor add Engineer submitter
boq add E-1 cum 100 1000 \"Earthwork in excavation\"
exec add E-1 60 2025-05-31
book save district
exit
";
    script(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Project RD-07 (Village link road) added."))
        .stdout(contains("Actor Engineer added as submitter."))
        .stdout(contains("recorded: 60 cum on E-1 (DRAFT)"));

    let json = std::fs::read_to_string(home.join("books").join("district.json")).unwrap();
    assert!(json.contains("\"RD-07\""));

    script(&home)
        .write_stdin("book load district\nproject list\nboq list\n")
        .assert()
        .success()
        .stdout(contains("Book `"))
        .stdout(contains("RD-07"))
        .stdout(contains("E-1"));
}

#[test]
fn script_mode_reports_errors_and_keeps_going() {
    let home = common::data_dir();
    let input = "\
projct list
project add RD-07 \"Village link road\"
actor add Checker verifier
boq add E-1 cum 100 1000 Earthwork
exec add E-1 10 2025-05-31
actor add Someone surveyor
version
";
    script(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Unknown command `projct`"))
        .stdout(contains("Suggestion: `project`?"))
        .stdout(contains("ERROR: Unauthorized: verifier cannot record executions"))
        .stdout(contains("unknown role `surveyor`"))
        .stdout(contains("=== Worksbill ").and(contains("Book schema")));
}

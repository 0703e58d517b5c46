#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use once_cell::sync::Lazy;
use tempfile::TempDir;
use worksbill::cli::shell_context::{CliMode, ShellContext};

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh data directory that outlives the calling test.
pub fn data_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Script-mode shell rooted in an isolated data directory.
pub fn setup_shell() -> (ShellContext, PathBuf) {
    let base = data_dir();
    let context =
        ShellContext::with_base_dir(CliMode::Script, base.clone()).expect("create shell context");
    (context, base)
}

/// Runs each line and fails the test on the first command error.
pub fn run(context: &mut ShellContext, lines: &[&str]) {
    for line in lines {
        if let Err(err) = context.process_line(line) {
            panic!("`{line}` failed: {err}");
        }
    }
}

/// Project RD-07 with one earthwork item and the four roles registered.
pub const SITE_SETUP: &[&str] = &[
    "project add RD-07 Village link road",
    "actor add Engineer submitter",
    "actor add Checker verifier",
    "actor add Accounts accounts",
    "actor add Approver approver",
    "fund add MH-5054 Roads and bridges",
    "fund allocate MH-5054 2025-26 500000",
    "boq add E-1 cum 100 1000 \"Earthwork in excavation\" MH-5054",
];

#![doc(test(attr(deny(warnings))))]

//! Worksbill tracks measured work against a bill of quantities, raises
//! running-account bills from verified quantities and reports physical
//! progress for public-works projects.

pub mod cli;
pub mod config;
pub mod errors;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!(version = utils::build_info::CLI_VERSION, "worksbill tracing initialized");
    });
}

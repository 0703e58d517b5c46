//! worksbill-core
//!
//! Ledger, execution workflow, bill calculation, progress and approval services.
//! Depends on worksbill-domain. No CLI, no terminal I/O, no direct storage interactions.

pub mod approval_router;
pub mod bill_calculator;
pub mod boq_ledger;
pub mod engine;
pub mod error;
pub mod execution_workflow;
pub mod money;
pub mod notify;
pub mod progress_aggregator;
pub mod registry;
pub mod storage;
pub mod time;

pub use approval_router::*;
pub use bill_calculator::*;
pub use boq_ledger::*;
pub use engine::*;
pub use error::CoreError;
pub use execution_workflow::*;
pub use notify::*;
pub use progress_aggregator::*;
pub use time::*;

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests;

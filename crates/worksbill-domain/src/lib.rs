//! worksbill-domain
//!
//! Pure domain models (BOQ items, executions, RA bills, approvals, funding, schedule).
//! No I/O, no CLI, no storage. Only data types and closed status vocabularies.

pub mod actor;
pub mod approval;
pub mod bill;
pub mod boq;
pub mod book;
pub mod common;
pub mod execution;
pub mod funding;
pub mod progress;
pub mod project;

pub use actor::*;
pub use approval::*;
pub use bill::*;
pub use boq::*;
pub use book::*;
pub use common::*;
pub use execution::*;
pub use funding::*;
pub use progress::*;
pub use project::*;

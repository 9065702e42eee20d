//! Pledge domain module
//!
//! The ledger is the single source of truth for pledge existence and status.
//! Legal transitions are exclusively PENDING→HELD, HELD→CAPTURED, and
//! HELD→REFUNDED.

mod model;
mod service;

pub use model::*;
pub use service::PledgeLedger;

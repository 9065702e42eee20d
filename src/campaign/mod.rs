//! Campaign domain module
//!
//! Models, threshold evaluation, and the campaign service. The service owns
//! the conditional status update that guarantees at-most-once transition of
//! a campaign out of LIVE.

mod model;
mod service;
pub mod threshold;

pub use model::*;
pub use service::CampaignService;
pub use threshold::{evaluate, ThresholdOutcome};

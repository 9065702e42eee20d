//! Route definitions for the SparkMade funding API

mod campaign;
mod pledge;
mod sweep;

pub use campaign::campaign_routes;
pub use pledge::pledge_routes;
pub use sweep::sweep_routes;

//! API handlers for the SparkMade funding core

mod campaign;
mod pledge;
mod sweep;

pub use campaign::*;
pub use pledge::*;
pub use sweep::*;

//! SparkMade funding core
//!
//! Backend service for the pledge/escrow/refund state machine behind the
//! SparkMade product-crowdfunding marketplace: the pledge ledger, campaign
//! threshold evaluation, the deadline sweep job, the payment gateway
//! adapter, and backer notifications.

pub mod campaign;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod pledge;
pub mod routes;
pub mod rules;
pub mod state;
pub mod sweep;

//! Sweep trigger route definitions

use axum::{routing::post, Router};

use crate::handlers::run_deadline_sweep;
use crate::state::AppState;

pub fn sweep_routes() -> Router<AppState> {
    Router::new().route("/api/cron/deadline-sweep", post(run_deadline_sweep))
}

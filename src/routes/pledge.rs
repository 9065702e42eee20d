//! Pledge route definitions

use axum::{routing::post, Router};

use crate::handlers::{confirm_hold, create_deposit};
use crate::state::AppState;

pub fn pledge_routes() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns/:id/pledges", post(create_deposit))
        .route("/api/pledges/:id/confirm", post(confirm_hold))
}

//! Campaign route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{create_campaign, get_campaign, list_campaigns, publish_campaign};
use crate::state::AppState;

pub fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns", post(create_campaign))
        .route("/api/campaigns", get(list_campaigns))
        .route("/api/campaigns/:id", get(get_campaign))
        .route("/api/campaigns/:id/publish", post(publish_campaign))
}

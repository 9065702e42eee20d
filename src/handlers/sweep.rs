//! Sweep trigger and health handlers

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::sweep::SweepSummary;

/// Cron-triggered deadline sweep. The external scheduler calls this once
/// per period with the configured bearer secret.
pub async fn run_deadline_sweep(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SweepSummary>> {
    authenticate_cron(&app_state, &headers)?;

    let summary = app_state.sweep.run(Utc::now()).await?;

    Ok(Json(summary))
}

/// Bearer-token cron auth, fail-closed when no secret is configured
fn authenticate_cron(app_state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    match &app_state.cron_secret {
        Some(secret) if !secret.is_empty() => {
            let provided = headers
                .get("authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default();

            if provided != format!("Bearer {}", secret) {
                return Err(ApiError::Unauthorized("Invalid cron secret".to_string()));
            }

            Ok(())
        }
        _ => {
            tracing::error!("Cron secret not configured - rejecting sweep trigger");
            Err(ApiError::ServiceUnavailable(
                "Sweep trigger is not configured".to_string(),
            ))
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let healthy = app_state.db.is_healthy().await;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: if healthy { "connected" } else { "disconnected" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn root() -> &'static str {
    "SparkMade Funding API"
}

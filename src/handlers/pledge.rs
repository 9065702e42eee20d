//! Pledge API handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::pledge::{ConfirmHoldRequest, CreateDepositRequest, DepositResponse, Pledge};
use crate::state::AppState;

/// Create a deposit pledge against a LIVE campaign
pub async fn create_deposit(
    State(app_state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<CreateDepositRequest>,
) -> ApiResult<(StatusCode, Json<DepositResponse>)> {
    request.validate()?;

    let pledge = app_state
        .ledger
        .create_pledge(campaign_id, request.backer_id, request.amount)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DepositResponse {
            pledge_id: pledge.id,
            hold_id: pledge.hold_id,
            status: pledge.status,
        }),
    ))
}

/// Gateway confirmation webhook: the processor reports the hold succeeded
/// and the pledge moves PENDING → HELD
pub async fn confirm_hold(
    State(app_state): State<AppState>,
    Path(pledge_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ConfirmHoldRequest>,
) -> ApiResult<Json<Pledge>> {
    authenticate_webhook(&app_state, &headers)?;

    let pledge = app_state
        .ledger
        .confirm_hold(pledge_id, &payload.hold_id)
        .await?;

    Ok(Json(pledge))
}

/// Shared-secret webhook auth. Fail-closed: an unconfigured secret rejects
/// every request rather than accepting them all.
fn authenticate_webhook(app_state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    match &app_state.gateway_webhook_secret {
        Some(secret) if !secret.is_empty() => {
            let provided = headers
                .get("X-Webhook-Secret")
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default();

            if provided != secret.as_str() {
                return Err(ApiError::Unauthorized(
                    "Invalid webhook secret".to_string(),
                ));
            }

            Ok(())
        }
        _ => {
            tracing::error!("Gateway webhook secret not configured - rejecting request");
            Err(ApiError::ServiceUnavailable(
                "Webhook endpoint is not configured".to_string(),
            ))
        }
    }
}

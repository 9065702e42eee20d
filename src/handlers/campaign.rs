//! Campaign API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::campaign::{
    Campaign, CampaignDetail, CampaignStatus, CreateCampaignRequest, ListCampaignsQuery,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create a campaign from a finalized draft. Banned categories are rejected
/// outright; restricted ones start in REVIEW instead of DRAFT.
pub async fn create_campaign(
    State(app_state): State<AppState>,
    Json(request): Json<CreateCampaignRequest>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    request.validate()?;

    if app_state.rules.is_banned(&request.category) {
        return Err(ApiError::UnprocessableEntity(format!(
            "Category '{}' cannot be listed",
            request.category
        )));
    }

    let initial_status = if app_state.rules.is_restricted(&request.category) {
        CampaignStatus::Review
    } else {
        CampaignStatus::Draft
    };

    let campaign = app_state
        .campaign_service
        .create_campaign(request, initial_status)
        .await?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// Get a campaign with its funding progress, computed on demand from the
/// live HELD pledge set
pub async fn get_campaign(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CampaignDetail>> {
    let campaign = app_state
        .campaign_service
        .get_campaign(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {} not found", id)))?;

    let funding = app_state.campaign_service.funding_progress(&campaign).await?;

    Ok(Json(CampaignDetail { campaign, funding }))
}

/// List campaigns with filtering and pagination
pub async fn list_campaigns(
    State(app_state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
) -> ApiResult<Json<Vec<Campaign>>> {
    let campaigns = app_state.campaign_service.list_campaigns(query).await?;

    Ok(Json(campaigns))
}

/// Publish a DRAFT or REVIEW campaign: it goes LIVE and starts accepting
/// deposits
pub async fn publish_campaign(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    let campaign = app_state.campaign_service.publish(&id).await?;

    Ok(Json(campaign))
}

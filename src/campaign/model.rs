//! Campaign models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::threshold::ThresholdOutcome;

/// Campaign model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Campaign {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub category: String,
    /// Per-backer deposit amount in minor currency units
    pub deposit_amount: i64,
    /// Target sale price in minor currency units
    pub target_price: i64,
    pub threshold_type: ThresholdType,
    pub threshold_value: i64,
    pub deadline_at: DateTime<Utc>,
    pub status: CampaignStatus,
    /// Gateway account receiving the payout after lock-in, when connected
    pub payout_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campaign lifecycle. LIVE is the only state accepting pledges; LOCKED and
/// CANCELED are terminal. Only the sweep job moves a campaign out of LIVE.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "campaign_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    Draft,
    Review,
    Live,
    Locked,
    Canceled,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Review => "review",
            CampaignStatus::Live => "live",
            CampaignStatus::Locked => "locked",
            CampaignStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Locked | CampaignStatus::Canceled)
    }
}

/// Funding goal kind: reserve a unit count or raise a total amount
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "threshold_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum ThresholdType {
    Units,
    Dollars,
}

/// Request DTO for creating a campaign from a finalized draft
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    pub creator_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1, max = 80))]
    pub category: String,
    #[validate(range(min = 1))]
    pub deposit_amount: i64,
    #[validate(range(min = 1))]
    pub target_price: i64,
    pub threshold_type: ThresholdType,
    #[validate(range(min = 1))]
    pub threshold_value: i64,
    pub deadline_at: DateTime<Utc>,
    pub payout_account_id: Option<String>,
}

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<CampaignStatus>,
    pub creator_id: Option<Uuid>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Campaign with its funding progress, computed on demand
#[derive(Debug, Serialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub funding: ThresholdOutcome,
}

//! Campaign service layer

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LedgerError;

use super::model::{Campaign, CampaignStatus, CreateCampaignRequest, ListCampaignsQuery};
use super::threshold::{evaluate, ThresholdOutcome};

/// Campaign service. Owns campaign rows and the conditional status update;
/// nothing else writes `campaigns.status`.
#[derive(Clone)]
pub struct CampaignService {
    pool: PgPool,
}

impl CampaignService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a campaign from a finalized draft. The initial status is
    /// decided by the caller after applying the category rules (restricted
    /// categories start in REVIEW).
    pub async fn create_campaign(
        &self,
        request: CreateCampaignRequest,
        initial_status: CampaignStatus,
    ) -> Result<Campaign, LedgerError> {
        let now = Utc::now();
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, creator_id, title, category, deposit_amount, target_price,
                threshold_type, threshold_value, deadline_at, status,
                payout_account_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.creator_id)
        .bind(&request.title)
        .bind(&request.category)
        .bind(request.deposit_amount)
        .bind(request.target_price)
        .bind(request.threshold_type)
        .bind(request.threshold_value)
        .bind(request.deadline_at)
        .bind(initial_status)
        .bind(&request.payout_account_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            campaign_id = %campaign.id,
            status = campaign.status.as_str(),
            "Campaign created"
        );

        Ok(campaign)
    }

    /// Get a single campaign by ID
    pub async fn get_campaign(&self, id: &Uuid) -> Result<Option<Campaign>, LedgerError> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(campaign)
    }

    /// List campaigns with filtering and pagination
    pub async fn list_campaigns(
        &self,
        query: ListCampaignsQuery,
    ) -> Result<Vec<Campaign>, LedgerError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM campaigns WHERE 1=1");

        if let Some(status) = query.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        if let Some(creator_id) = query.creator_id {
            query_builder.push(" AND creator_id = ");
            query_builder.push_bind(creator_id);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset as i64);

        let campaigns = query_builder
            .build_query_as::<Campaign>()
            .fetch_all(&self.pool)
            .await?;

        Ok(campaigns)
    }

    /// Move a DRAFT or REVIEW campaign to LIVE
    pub async fn publish(&self, id: &Uuid) -> Result<Campaign, LedgerError> {
        let published = sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET status = 'live', updated_at = $2
            WHERE id = $1 AND status IN ('draft', 'review')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match published {
            Some(campaign) => Ok(campaign),
            None => match self.get_campaign(id).await? {
                Some(existing) => Err(LedgerError::InvalidTransition {
                    from: existing.status.as_str(),
                    to: "live",
                }),
                None => Err(LedgerError::NotFound {
                    entity: "campaign",
                    id: *id,
                }),
            },
        }
    }

    /// Amounts of the campaign's HELD pledges. This is the only pledge set
    /// that counts toward funding.
    pub async fn held_amounts(&self, campaign_id: &Uuid) -> Result<Vec<i64>, LedgerError> {
        let rows = sqlx::query_as::<_, (i64,)>(
            "SELECT amount FROM pledges WHERE campaign_id = $1 AND status = 'held'",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(amount,)| amount).collect())
    }

    /// Evaluate the funding goal from the live HELD pledge set
    pub async fn funding_progress(
        &self,
        campaign: &Campaign,
    ) -> Result<ThresholdOutcome, LedgerError> {
        let held = self.held_amounts(&campaign.id).await?;
        Ok(evaluate(
            campaign.threshold_type,
            campaign.threshold_value,
            &held,
        ))
    }

    /// LIVE campaigns whose deadline is strictly before `now`
    pub async fn live_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, LedgerError> {
        let campaigns = sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE status = 'live' AND deadline_at < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }

    /// Resolved campaigns that still carry HELD pledges, left behind by a
    /// partial capture/refund failure in an earlier sweep
    pub async fn resolved_with_held_pledges(&self) -> Result<Vec<Campaign>, LedgerError> {
        let campaigns = sqlx::query_as::<_, Campaign>(
            r#"
            SELECT c.* FROM campaigns c
            WHERE c.status IN ('locked', 'canceled')
              AND EXISTS (
                  SELECT 1 FROM pledges p
                  WHERE p.campaign_id = c.id AND p.status = 'held'
              )
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }

    /// Conditionally transition a campaign out of LIVE. The WHERE clause on
    /// the current status makes this a compare-and-swap: of two concurrent
    /// sweep runs, exactly one sees a row updated. The loser gets
    /// `ConcurrentTransitionLost`, which means "already handled".
    pub async fn transition_from_live(
        &self,
        id: &Uuid,
        to: CampaignStatus,
    ) -> Result<(), LedgerError> {
        debug_assert!(to.is_terminal());

        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = 'live'
            "#,
        )
        .bind(id)
        .bind(to)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::ConcurrentTransitionLost(*id));
        }

        tracing::info!(campaign_id = %id, to = to.as_str(), "Campaign resolved");

        Ok(())
    }
}

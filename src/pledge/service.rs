//! Pledge ledger service layer

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::campaign::{Campaign, CampaignStatus};
use crate::error::LedgerError;
use crate::gateway::{HoldMetadata, PaymentGateway};
use crate::models::User;
use crate::notify::{Notifier, NotificationEvent};

use super::model::{BatchOutcome, Pledge, PledgeFailure, PledgeStatus};

/// The authoritative record of backer deposits. All pledge mutation goes
/// through this service; the sweep job and webhook handlers never touch
/// pledge rows directly.
pub struct PledgeLedger {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<Notifier>,
}

impl PledgeLedger {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, notifier: Arc<Notifier>) -> Self {
        Self {
            pool,
            gateway,
            notifier,
        }
    }

    /// Create a deposit pledge against a LIVE campaign.
    ///
    /// Validation happens before any gateway call: a non-positive amount or
    /// a non-LIVE campaign is rejected without creating a hold. On success
    /// the pledge starts in PENDING, carrying the hold id the gateway
    /// returned; it only counts toward funding once the hold is confirmed.
    pub async fn create_pledge(
        &self,
        campaign_id: Uuid,
        backer_id: Uuid,
        amount: i64,
    ) -> Result<Pledge, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let campaign = self.require_campaign(campaign_id).await?;
        if campaign.status != CampaignStatus::Live {
            return Err(LedgerError::CampaignNotLive(campaign_id));
        }

        let backer = self.require_backer(backer_id).await?;

        let hold_id = self
            .gateway
            .create_hold(
                amount,
                HoldMetadata {
                    campaign_id,
                    backer_id,
                },
            )
            .await?;

        let now = Utc::now();
        let pledge = sqlx::query_as::<_, Pledge>(
            r#"
            INSERT INTO pledges (
                id, campaign_id, backer_id, amount, hold_id, status,
                refunded_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', NULL, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(campaign_id)
        .bind(backer_id)
        .bind(amount)
        .bind(&hold_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            pledge_id = %pledge.id,
            campaign_id = %campaign_id,
            amount,
            "Pledge created"
        );

        self.notifier
            .notify(
                NotificationEvent::DepositConfirmed,
                &backer.email,
                backer.name.as_deref(),
                &campaign.title,
                Some(amount),
            )
            .await;

        Ok(pledge)
    }

    /// Confirm the gateway hold: PENDING → HELD.
    ///
    /// Confirming a pledge that is not PENDING is an `InvalidTransition`
    /// error, not an idempotent no-op; re-invocation is treated as a bug
    /// signal in the confirming system.
    pub async fn confirm_hold(
        &self,
        pledge_id: Uuid,
        hold_id: &str,
    ) -> Result<Pledge, LedgerError> {
        let pledge = self.require_pledge(pledge_id).await?;

        if pledge.status != PledgeStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                from: pledge.status.as_str(),
                to: PledgeStatus::Held.as_str(),
            });
        }

        let confirmed = sqlx::query_as::<_, Pledge>(
            r#"
            UPDATE pledges
            SET status = 'held', hold_id = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(pledge_id)
        .bind(hold_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        // The row moved between the read and the conditional update
        .ok_or(LedgerError::InvalidTransition {
            from: PledgeStatus::Pending.as_str(),
            to: PledgeStatus::Held.as_str(),
        })?;

        tracing::info!(pledge_id = %pledge_id, "Hold confirmed, pledge is HELD");

        Ok(confirmed)
    }

    /// Capture every HELD pledge under a campaign: HELD → CAPTURED.
    ///
    /// A single pledge's gateway failure is recorded in the outcome and does
    /// not halt the remaining pledges. Failed pledges stay HELD, so a retry
    /// of the batch only touches what is still unresolved.
    pub async fn capture_all(&self, campaign_id: Uuid) -> Result<BatchOutcome, LedgerError> {
        let held = self.held_pledges(campaign_id).await?;
        let mut outcome = BatchOutcome::default();

        for pledge in held {
            match self.gateway.capture(&pledge.hold_id).await {
                Ok(()) => {
                    let updated = sqlx::query(
                        r#"
                        UPDATE pledges
                        SET status = 'captured', updated_at = $2
                        WHERE id = $1 AND status = 'held'
                        "#,
                    )
                    .bind(pledge.id)
                    .bind(Utc::now())
                    .execute(&self.pool)
                    .await?;

                    if updated.rows_affected() == 0 {
                        tracing::debug!(pledge_id = %pledge.id, "Pledge already resolved elsewhere");
                        outcome.already_resolved += 1;
                    } else {
                        outcome.succeeded += 1;
                        outcome.amount += pledge.amount;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        pledge_id = %pledge.id,
                        campaign_id = %campaign_id,
                        error = %e,
                        "Capture failed, pledge stays HELD for retry"
                    );
                    outcome.failures.push(PledgeFailure {
                        pledge_id: pledge.id,
                        detail: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            campaign_id = %campaign_id,
            captured = outcome.succeeded,
            failed = outcome.failures.len(),
            "Capture batch complete"
        );

        Ok(outcome)
    }

    /// Refund every HELD pledge under a campaign: HELD → REFUNDED, with a
    /// refund timestamp. Same partial-failure semantics as `capture_all`.
    pub async fn refund_all(&self, campaign_id: Uuid) -> Result<BatchOutcome, LedgerError> {
        let held = self.held_pledges(campaign_id).await?;
        let mut outcome = BatchOutcome::default();

        for pledge in held {
            match self.gateway.refund(&pledge.hold_id).await {
                Ok(()) => {
                    let now = Utc::now();
                    let updated = sqlx::query(
                        r#"
                        UPDATE pledges
                        SET status = 'refunded', refunded_at = $2, updated_at = $2
                        WHERE id = $1 AND status = 'held'
                        "#,
                    )
                    .bind(pledge.id)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;

                    if updated.rows_affected() == 0 {
                        tracing::debug!(pledge_id = %pledge.id, "Pledge already resolved elsewhere");
                        outcome.already_resolved += 1;
                    } else {
                        outcome.succeeded += 1;
                        outcome.amount += pledge.amount;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        pledge_id = %pledge.id,
                        campaign_id = %campaign_id,
                        error = %e,
                        "Refund failed, pledge stays HELD for retry"
                    );
                    outcome.failures.push(PledgeFailure {
                        pledge_id: pledge.id,
                        detail: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            campaign_id = %campaign_id,
            refunded = outcome.succeeded,
            failed = outcome.failures.len(),
            "Refund batch complete"
        );

        Ok(outcome)
    }

    /// Get a single pledge by ID
    pub async fn get_pledge(&self, id: &Uuid) -> Result<Option<Pledge>, LedgerError> {
        let pledge = sqlx::query_as::<_, Pledge>("SELECT * FROM pledges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pledge)
    }

    async fn held_pledges(&self, campaign_id: Uuid) -> Result<Vec<Pledge>, LedgerError> {
        let pledges = sqlx::query_as::<_, Pledge>(
            "SELECT * FROM pledges WHERE campaign_id = $1 AND status = 'held'",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pledges)
    }

    async fn require_campaign(&self, id: Uuid) -> Result<Campaign, LedgerError> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound {
                entity: "campaign",
                id,
            })
    }

    async fn require_backer(&self, id: Uuid) -> Result<User, LedgerError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound {
                entity: "backer",
                id,
            })
    }

    async fn require_pledge(&self, id: Uuid) -> Result<Pledge, LedgerError> {
        sqlx::query_as::<_, Pledge>("SELECT * FROM pledges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound {
                entity: "pledge",
                id,
            })
    }
}

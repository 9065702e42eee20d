//! Deadline sweep job
//!
//! The only component allowed to transition a campaign out of LIVE. Each
//! invocation reads "now" once, selects every LIVE campaign past deadline,
//! and resolves each one independently: goal met means LOCKED plus capture,
//! goal missed means CANCELED plus refund. The conditional status update in
//! `CampaignService::transition_from_live` makes the selection-plus-write
//! critical section at-most-once under concurrent runs.
//!
//! A partial batch failure leaves some pledges HELD on a resolved campaign;
//! each run starts by re-settling those before the deadline selection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::campaign::{evaluate, Campaign, CampaignService, CampaignStatus};
use crate::error::LedgerError;
use crate::gateway::PaymentGateway;
use crate::notify::{Notifier, NotificationEvent};
use crate::pledge::PledgeLedger;
use crate::rules::platform_fee;

/// Summary returned to the scheduler after one sweep invocation
#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    /// LIVE campaigns past deadline found by the selection query
    pub examined: usize,
    pub locked: usize,
    pub canceled: usize,
    /// Campaigns another concurrent run resolved first
    pub already_resolved: usize,
    /// Resolved campaigns whose leftover HELD pledges were re-batched
    pub retried: usize,
    /// Campaigns skipped because of a processing error (retried next run)
    pub errored: usize,
    /// Per-pledge capture/refund failures across all campaigns
    pub pledge_failures: usize,
}

/// One campaign's resolution within a sweep
enum Resolution {
    Locked { pledge_failures: usize },
    Canceled { pledge_failures: usize },
    AlreadyResolved,
}

pub struct DeadlineSweep {
    pool: PgPool,
    campaigns: CampaignService,
    ledger: Arc<PledgeLedger>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<Notifier>,
}

impl DeadlineSweep {
    pub fn new(
        pool: PgPool,
        campaigns: CampaignService,
        ledger: Arc<PledgeLedger>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            pool,
            campaigns,
            ledger,
            gateway,
            notifier,
        }
    }

    /// Run one sweep at the given instant. Safe to re-run: already-resolved
    /// campaigns fall out of the selection, and a run that loses the
    /// conditional update race counts the campaign as already handled.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepSummary, LedgerError> {
        let mut summary = SweepSummary::default();

        // Pledges stranded HELD by a partial batch failure in an earlier
        // sweep: re-run the batch matching the campaign's resolved status.
        // The batch only touches rows still HELD, so already-settled
        // pledges are untouched. Selected before the deadline pass so a
        // failure in this run waits for the next one.
        let stragglers = self.campaigns.resolved_with_held_pledges().await?;
        for campaign in stragglers {
            match self.settle(&campaign, campaign.status).await {
                Ok(pledge_failures) => {
                    summary.retried += 1;
                    summary.pledge_failures += pledge_failures;
                }
                Err(e) => {
                    tracing::error!(
                        campaign_id = %campaign.id,
                        error = %e,
                        "Failed to settle leftover pledges, will retry next sweep"
                    );
                    summary.errored += 1;
                }
            }
        }

        let due = self.campaigns.live_past_deadline(now).await?;
        summary.examined = due.len();

        tracing::info!(count = due.len(), "Found campaigns past deadline");

        for campaign in due {
            match self.resolve_campaign(&campaign).await {
                Ok(Resolution::Locked { pledge_failures }) => {
                    summary.locked += 1;
                    summary.pledge_failures += pledge_failures;
                }
                Ok(Resolution::Canceled { pledge_failures }) => {
                    summary.canceled += 1;
                    summary.pledge_failures += pledge_failures;
                }
                Ok(Resolution::AlreadyResolved) => {
                    summary.already_resolved += 1;
                }
                // One campaign's failure must not stop the batch. Still-LIVE
                // campaigns reappear in the deadline selection; resolved ones
                // with leftover HELD pledges in the straggler pass.
                Err(e) => {
                    tracing::error!(
                        campaign_id = %campaign.id,
                        error = %e,
                        "Failed to resolve campaign, will retry next sweep"
                    );
                    summary.errored += 1;
                }
            }
        }

        tracing::info!(
            examined = summary.examined,
            locked = summary.locked,
            canceled = summary.canceled,
            already_resolved = summary.already_resolved,
            retried = summary.retried,
            errored = summary.errored,
            "Deadline sweep complete"
        );

        Ok(summary)
    }

    async fn resolve_campaign(&self, campaign: &Campaign) -> Result<Resolution, LedgerError> {
        let held = self.campaigns.held_amounts(&campaign.id).await?;
        let outcome = evaluate(campaign.threshold_type, campaign.threshold_value, &held);

        let target = if outcome.goal_met {
            CampaignStatus::Locked
        } else {
            CampaignStatus::Canceled
        };

        match self.campaigns.transition_from_live(&campaign.id, target).await {
            Ok(()) => {}
            Err(LedgerError::ConcurrentTransitionLost(_)) => {
                tracing::debug!(campaign_id = %campaign.id, "Campaign already resolved");
                return Ok(Resolution::AlreadyResolved);
            }
            Err(e) => return Err(e),
        }

        let pledge_failures = self.settle(campaign, target).await?;

        if outcome.goal_met {
            Ok(Resolution::Locked { pledge_failures })
        } else {
            Ok(Resolution::Canceled { pledge_failures })
        }
    }

    /// Run the capture or refund batch matching the campaign's resolved
    /// status, pay out and notify, and return the per-pledge failure count.
    /// Idempotent: the batch's conditional updates only touch rows still
    /// HELD, so re-running after a partial failure settles the remainder.
    async fn settle(
        &self,
        campaign: &Campaign,
        status: CampaignStatus,
    ) -> Result<usize, LedgerError> {
        // Backer contact rows are read before the batch flips pledge
        // statuses out of HELD.
        let recipients = self.backer_recipients(&campaign.id).await?;

        if status == CampaignStatus::Locked {
            let batch = self.ledger.capture_all(campaign.id).await?;

            self.pay_out(campaign, batch.amount).await;
            self.notify_backers(
                campaign,
                NotificationEvent::ProjectLocked,
                &recipients,
                &batch.failures.iter().map(|f| f.pledge_id).collect::<Vec<_>>(),
            )
            .await;

            Ok(batch.failures.len())
        } else {
            let batch = self.ledger.refund_all(campaign.id).await?;

            self.notify_backers(
                campaign,
                NotificationEvent::ProjectRefunded,
                &recipients,
                &batch.failures.iter().map(|f| f.pledge_id).collect::<Vec<_>>(),
            )
            .await;

            Ok(batch.failures.len())
        }
    }

    /// Transfer the captured total minus the platform fee to the campaign's
    /// connected payout account. A transfer failure never un-locks the
    /// campaign; it is logged for manual follow-up.
    async fn pay_out(&self, campaign: &Campaign, captured_amount: i64) {
        let destination = match &campaign.payout_account_id {
            Some(account) => account,
            None => return,
        };
        if captured_amount <= 0 {
            return;
        }

        let net = captured_amount - platform_fee(captured_amount);
        match self.gateway.transfer(net, destination, campaign.id).await {
            Ok(transfer_id) => {
                tracing::info!(
                    campaign_id = %campaign.id,
                    transfer_id,
                    amount = net,
                    "Payout transferred"
                );
            }
            Err(e) => {
                tracing::error!(
                    campaign_id = %campaign.id,
                    error = %e,
                    "Payout transfer failed, needs manual follow-up"
                );
            }
        }
    }

    async fn notify_backers(
        &self,
        campaign: &Campaign,
        event: NotificationEvent,
        recipients: &[BackerRecipient],
        failed_pledges: &[Uuid],
    ) {
        for recipient in recipients {
            // Backers whose pledge failed to settle keep their HELD state
            // and get notified on the retry that resolves them.
            if failed_pledges.contains(&recipient.pledge_id) {
                continue;
            }

            self.notifier
                .notify(
                    event,
                    &recipient.email,
                    recipient.name.as_deref(),
                    &campaign.title,
                    Some(recipient.amount),
                )
                .await;
        }
    }

    async fn backer_recipients(
        &self,
        campaign_id: &Uuid,
    ) -> Result<Vec<BackerRecipient>, LedgerError> {
        let rows = sqlx::query_as::<_, BackerRecipient>(
            r#"
            SELECT p.id AS pledge_id, u.email, u.name, p.amount
            FROM pledges p
            JOIN users u ON u.id = p.backer_id
            WHERE p.campaign_id = $1 AND p.status = 'held'
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BackerRecipient {
    pledge_id: Uuid,
    email: String,
    name: Option<String>,
    amount: i64,
}

/// Optional in-process trigger. The external scheduler hitting the cron
/// endpoint is the primary trigger; this loop exists for deployments
/// without one.
pub async fn sweep_scheduler(sweep: Arc<DeadlineSweep>, interval_seconds: u64) {
    tracing::info!(interval_seconds, "Starting sweep scheduler");

    loop {
        tokio::time::sleep(Duration::from_secs(interval_seconds)).await;

        match sweep.run(Utc::now()).await {
            Ok(summary) if summary.examined > 0 || summary.retried > 0 => {
                tracing::info!(
                    locked = summary.locked,
                    canceled = summary.canceled,
                    retried = summary.retried,
                    "Scheduled sweep resolved campaigns"
                );
            }
            Ok(_) => {
                tracing::debug!("Scheduled sweep found nothing to resolve");
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled sweep failed");
            }
        }
    }
}

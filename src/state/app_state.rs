//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::campaign::CampaignService;
use crate::db::Database;
use crate::pledge::PledgeLedger;
use crate::rules::CategoryRules;
use crate::sweep::DeadlineSweep;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub campaign_service: Arc<CampaignService>,
    pub ledger: Arc<PledgeLedger>,
    pub sweep: Arc<DeadlineSweep>,
    pub rules: CategoryRules,
    /// Shared secret for the gateway confirmation webhook (fail-closed)
    pub gateway_webhook_secret: Option<String>,
    /// Bearer secret for the cron sweep trigger (fail-closed)
    pub cron_secret: Option<String>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        campaign_service: Arc<CampaignService>,
        ledger: Arc<PledgeLedger>,
        sweep: Arc<DeadlineSweep>,
        rules: CategoryRules,
        gateway_webhook_secret: Option<String>,
        cron_secret: Option<String>,
    ) -> Self {
        Self {
            db,
            campaign_service,
            ledger,
            sweep,
            rules,
            gateway_webhook_secret,
            cron_secret,
        }
    }
}

impl FromRef<AppState> for Arc<CampaignService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.campaign_service.clone()
    }
}

impl FromRef<AppState> for Arc<PledgeLedger> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger.clone()
    }
}

impl FromRef<AppState> for Arc<DeadlineSweep> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sweep.clone()
    }
}

//! Shared helpers for integration tests: a recording mock gateway and
//! test-database fixtures.

#![allow(dead_code)]

use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use sparkmade_backend::campaign::{CampaignStatus, ThresholdType};
use sparkmade_backend::gateway::{GatewayError, HoldMetadata, PaymentGateway};
use sparkmade_backend::notify::Notifier;
use sparkmade_backend::pledge::PledgeStatus;

/// One recorded gateway round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Hold { amount: i64 },
    Capture { hold_id: String },
    Refund { hold_id: String },
    Transfer { amount: i64, destination: String },
}

/// In-memory gateway that records every call and can be told to reject
/// capture/refund for specific hold ids.
#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<GatewayCall>>,
    failing_holds: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make capture/refund fail for the given hold id
    pub fn fail_for(&self, hold_id: &str) {
        self.failing_holds
            .lock()
            .unwrap()
            .insert(hold_id.to_string());
    }

    /// Clear injected failures (simulates the processor recovering)
    pub fn clear_failures(&self) {
        self.failing_holds.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn should_fail(&self, hold_id: &str) -> bool {
        self.failing_holds.lock().unwrap().contains(hold_id)
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_hold(
        &self,
        amount: i64,
        _metadata: HoldMetadata,
    ) -> Result<String, GatewayError> {
        self.record(GatewayCall::Hold { amount });
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("hold_{}", n))
    }

    async fn capture(&self, hold_id: &str) -> Result<(), GatewayError> {
        if self.should_fail(hold_id) {
            return Err(GatewayError::Rejected {
                operation: "capture",
                detail: "card_declined".to_string(),
            });
        }
        self.record(GatewayCall::Capture {
            hold_id: hold_id.to_string(),
        });
        Ok(())
    }

    async fn refund(&self, hold_id: &str) -> Result<(), GatewayError> {
        if self.should_fail(hold_id) {
            return Err(GatewayError::Rejected {
                operation: "refund",
                detail: "charge_already_refunded".to_string(),
            });
        }
        self.record(GatewayCall::Refund {
            hold_id: hold_id.to_string(),
        });
        Ok(())
    }

    async fn transfer(
        &self,
        amount: i64,
        destination: &str,
        _campaign_id: Uuid,
    ) -> Result<String, GatewayError> {
        self.record(GatewayCall::Transfer {
            amount,
            destination: destination.to_string(),
        });
        Ok("tr_test".to_string())
    }
}

/// Notifier without an API key: logs and skips, sends nothing
pub fn test_notifier() -> Arc<Notifier> {
    Arc::new(Notifier::new(
        None,
        "SparkMade <no-reply@sparkmade.com>".to_string(),
    ))
}

/// Connect to the test database and apply migrations
pub async fn setup_test_db() -> PgPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/sparkmade_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn insert_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, name, role) VALUES ($1, $2, $3, 'backer')")
        .bind(id)
        .bind(format!("backer-{}@example.com", id))
        .bind("Test Backer")
        .execute(pool)
        .await
        .expect("Failed to insert user");
    id
}

pub async fn insert_campaign(
    pool: &PgPool,
    creator_id: Uuid,
    status: CampaignStatus,
    threshold_type: ThresholdType,
    threshold_value: i64,
    deposit_amount: i64,
    deadline_at: DateTime<Utc>,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO campaigns (
            id, creator_id, title, category, deposit_amount, target_price,
            threshold_type, threshold_value, deadline_at, status,
            payout_account_id, created_at, updated_at
        )
        VALUES ($1, $2, 'Test Campaign', 'home goods', $3, $4, $5, $6, $7, $8, NULL, $9, $9)
        "#,
    )
    .bind(id)
    .bind(creator_id)
    .bind(deposit_amount)
    .bind(deposit_amount * 4)
    .bind(threshold_type)
    .bind(threshold_value)
    .bind(deadline_at)
    .bind(status)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to insert campaign");
    id
}

pub async fn insert_pledge(
    pool: &PgPool,
    campaign_id: Uuid,
    backer_id: Uuid,
    amount: i64,
    status: PledgeStatus,
    hold_id: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO pledges (
            id, campaign_id, backer_id, amount, hold_id, status,
            refunded_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $7)
        "#,
    )
    .bind(id)
    .bind(campaign_id)
    .bind(backer_id)
    .bind(amount)
    .bind(hold_id)
    .bind(status)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to insert pledge");
    id
}

pub async fn pledge_status(pool: &PgPool, id: Uuid) -> PledgeStatus {
    let (status,) = sqlx::query_as::<_, (PledgeStatus,)>("SELECT status FROM pledges WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("Pledge not found");
    status
}

pub async fn campaign_status(pool: &PgPool, id: Uuid) -> CampaignStatus {
    let (status,) =
        sqlx::query_as::<_, (CampaignStatus,)>("SELECT status FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("Campaign not found");
    status
}

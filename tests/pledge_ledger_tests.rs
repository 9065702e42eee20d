//! Pledge ledger integration tests
//!
//! DB-backed tests are marked #[ignore] and need TEST_DATABASE_URL pointing
//! at a migratable Postgres instance:
//!   cargo test --test pledge_ledger_tests -- --ignored

mod common;

use chrono::{Duration, Utc};
use std::sync::Arc;

use sparkmade_backend::campaign::{CampaignStatus, ThresholdType};
use sparkmade_backend::error::LedgerError;
use sparkmade_backend::pledge::{PledgeLedger, PledgeStatus};

use common::{
    insert_campaign, insert_pledge, insert_user, pledge_status, setup_test_db, test_notifier,
    GatewayCall, MockGateway,
};

fn ledger_with(pool: &sqlx::PgPool, gateway: Arc<MockGateway>) -> PledgeLedger {
    PledgeLedger::new(pool.clone(), gateway, test_notifier())
}

#[tokio::test]
#[ignore]
async fn test_create_pledge_holds_and_starts_pending() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;
    let campaign = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Live,
        ThresholdType::Units,
        2,
        500,
        Utc::now() + Duration::days(7),
    )
    .await;

    let pledge = ledger
        .create_pledge(campaign, backer, 500)
        .await
        .expect("Pledge creation should succeed");

    assert_eq!(pledge.status, PledgeStatus::Pending);
    assert_eq!(pledge.amount, 500);
    assert!(pledge.hold_id.starts_with("hold_"));
    assert_eq!(gateway.calls(), vec![GatewayCall::Hold { amount: 500 }]);
}

#[tokio::test]
#[ignore]
async fn test_create_pledge_rejects_non_positive_amount_before_gateway() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;
    let campaign = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Live,
        ThresholdType::Units,
        2,
        500,
        Utc::now() + Duration::days(7),
    )
    .await;

    for amount in [0, -100] {
        let err = ledger
            .create_pledge(campaign, backer, amount)
            .await
            .expect_err("Non-positive amount must be rejected");
        assert!(matches!(err, LedgerError::InvalidAmount(a) if a == amount));
    }

    // The amount check comes before the status check, so a non-LIVE
    // campaign still reports InvalidAmount
    let draft = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Draft,
        ThresholdType::Units,
        2,
        500,
        Utc::now() + Duration::days(7),
    )
    .await;
    let err = ledger
        .create_pledge(draft, backer, 0)
        .await
        .expect_err("Non-positive amount must be rejected on any campaign");
    assert!(matches!(err, LedgerError::InvalidAmount(0)));

    // Validation fails before the processor is ever contacted
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
#[ignore]
async fn test_create_pledge_requires_live_campaign() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;

    for status in [
        CampaignStatus::Draft,
        CampaignStatus::Review,
        CampaignStatus::Locked,
        CampaignStatus::Canceled,
    ] {
        let campaign = insert_campaign(
            &pool,
            creator,
            status,
            ThresholdType::Units,
            2,
            500,
            Utc::now() + Duration::days(7),
        )
        .await;

        let err = ledger
            .create_pledge(campaign, backer, 500)
            .await
            .expect_err("Pledging a non-LIVE campaign must fail");
        assert!(matches!(err, LedgerError::CampaignNotLive(id) if id == campaign));

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pledges WHERE campaign_id = $1")
                .bind(campaign)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0, "No pledge record may exist for {:?}", status);
    }

    assert_eq!(gateway.call_count(), 0, "No hold may be placed");
}

#[tokio::test]
#[ignore]
async fn test_create_pledge_unknown_campaign_is_not_found() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let backer = insert_user(&pool).await;

    let err = ledger
        .create_pledge(uuid::Uuid::new_v4(), backer, 500)
        .await
        .expect_err("Unknown campaign must be NotFound");
    assert!(matches!(
        err,
        LedgerError::NotFound {
            entity: "campaign",
            ..
        }
    ));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
#[ignore]
async fn test_confirm_hold_moves_pending_to_held_exactly_once() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;
    let campaign = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Live,
        ThresholdType::Units,
        2,
        500,
        Utc::now() + Duration::days(7),
    )
    .await;

    let pledge = ledger.create_pledge(campaign, backer, 500).await.unwrap();

    let confirmed = ledger
        .confirm_hold(pledge.id, &pledge.hold_id)
        .await
        .expect("First confirmation should succeed");
    assert_eq!(confirmed.status, PledgeStatus::Held);

    // Re-confirmation is a transition error, not an idempotent no-op
    let err = ledger
        .confirm_hold(pledge.id, &pledge.hold_id)
        .await
        .expect_err("Second confirmation must fail");
    assert!(matches!(
        err,
        LedgerError::InvalidTransition {
            from: "held",
            to: "held"
        }
    ));

    assert_eq!(pledge_status(&pool, pledge.id).await, PledgeStatus::Held);
}

#[tokio::test]
#[ignore]
async fn test_confirm_hold_unknown_pledge_is_not_found() {
    let pool = setup_test_db().await;
    let ledger = ledger_with(&pool, MockGateway::new());

    let err = ledger
        .confirm_hold(uuid::Uuid::new_v4(), "hold_x")
        .await
        .expect_err("Unknown pledge must be NotFound");
    assert!(matches!(
        err,
        LedgerError::NotFound {
            entity: "pledge",
            ..
        }
    ));
}

#[tokio::test]
#[ignore]
async fn test_capture_all_skips_pending_and_resolved_pledges() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;
    let campaign = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Live,
        ThresholdType::Units,
        2,
        500,
        Utc::now() - Duration::days(1),
    )
    .await;

    let held = insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Held, "hold_a").await;
    let pending =
        insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Pending, "hold_b").await;
    let refunded =
        insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Refunded, "hold_c").await;

    let outcome = ledger.capture_all(campaign).await.unwrap();

    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.amount, 500);
    assert!(outcome.failures.is_empty());

    assert_eq!(pledge_status(&pool, held).await, PledgeStatus::Captured);
    assert_eq!(pledge_status(&pool, pending).await, PledgeStatus::Pending);
    assert_eq!(pledge_status(&pool, refunded).await, PledgeStatus::Refunded);

    // Only the HELD pledge's hold was touched
    assert_eq!(
        gateway.calls(),
        vec![GatewayCall::Capture {
            hold_id: "hold_a".to_string()
        }]
    );
}

#[tokio::test]
#[ignore]
async fn test_capture_all_partial_failure_leaves_failed_pledges_held() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;
    let campaign = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Live,
        ThresholdType::Units,
        3,
        500,
        Utc::now() - Duration::days(1),
    )
    .await;

    let p1 = insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Held, "hold_1").await;
    let p2 = insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Held, "hold_2").await;
    let p3 = insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Held, "hold_3").await;

    gateway.fail_for("hold_2");

    let outcome = ledger.capture_all(campaign).await.unwrap();

    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.amount, 1000);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].pledge_id, p2);

    assert_eq!(pledge_status(&pool, p1).await, PledgeStatus::Captured);
    assert_eq!(pledge_status(&pool, p2).await, PledgeStatus::Held);
    assert_eq!(pledge_status(&pool, p3).await, PledgeStatus::Captured);

    // Retry after the processor recovers only touches the unresolved pledge
    gateway.clear_failures();
    let retry = ledger.capture_all(campaign).await.unwrap();
    assert_eq!(retry.succeeded, 1);
    assert_eq!(retry.amount, 500);
    assert!(retry.failures.is_empty());
    assert_eq!(pledge_status(&pool, p2).await, PledgeStatus::Captured);
}

#[tokio::test]
#[ignore]
async fn test_refund_all_stamps_refunded_at() {
    let pool = setup_test_db().await;
    let gateway = MockGateway::new();
    let ledger = ledger_with(&pool, gateway.clone());

    let creator = insert_user(&pool).await;
    let backer = insert_user(&pool).await;
    let campaign = insert_campaign(
        &pool,
        creator,
        CampaignStatus::Live,
        ThresholdType::Units,
        2,
        500,
        Utc::now() - Duration::days(1),
    )
    .await;

    let pledge = insert_pledge(&pool, campaign, backer, 500, PledgeStatus::Held, "hold_r").await;

    let outcome = ledger.refund_all(campaign).await.unwrap();
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.amount, 500);

    let refunded = ledger.get_pledge(&pledge).await.unwrap().unwrap();
    assert_eq!(refunded.status, PledgeStatus::Refunded);
    assert!(refunded.refunded_at.is_some());
}

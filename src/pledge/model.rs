//! Pledge models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Pledge model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Pledge {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub backer_id: Uuid,
    /// Deposit amount in minor currency units, always positive
    pub amount: i64,
    /// Processor hold reference (manual-capture payment intent id)
    pub hold_id: String,
    pub status: PledgeStatus,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pledge lifecycle. PENDING pledges never count toward funding; CAPTURED
/// and REFUNDED are terminal.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "pledge_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PledgeStatus {
    Pending,
    Held,
    Captured,
    Refunded,
}

impl PledgeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PledgeStatus::Pending => "pending",
            PledgeStatus::Held => "held",
            PledgeStatus::Captured => "captured",
            PledgeStatus::Refunded => "refunded",
        }
    }

    /// The legal edges of the pledge state machine, and nothing else
    pub fn can_transition_to(self, next: PledgeStatus) -> bool {
        matches!(
            (self, next),
            (PledgeStatus::Pending, PledgeStatus::Held)
                | (PledgeStatus::Held, PledgeStatus::Captured)
                | (PledgeStatus::Held, PledgeStatus::Refunded)
        )
    }
}

/// Request DTO for creating a deposit against a campaign
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepositRequest {
    pub backer_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
}

/// Response DTO for deposit creation
#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub pledge_id: Uuid,
    pub hold_id: String,
    pub status: PledgeStatus,
}

/// Payload from the gateway confirmation webhook
#[derive(Debug, Deserialize)]
pub struct ConfirmHoldRequest {
    pub hold_id: String,
}

/// Outcome of a capture/refund batch. A single pledge failure never halts
/// siblings; failed pledges stay HELD and are retriable later.
#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    /// Pledges transitioned in this run
    pub succeeded: usize,
    /// Total amount (minor units) across succeeded pledges
    pub amount: i64,
    /// Pledges already resolved by another process, skipped here
    pub already_resolved: usize,
    pub failures: Vec<PledgeFailure>,
}

/// Per-pledge gateway failure, recorded without aborting the batch
#[derive(Debug, Serialize)]
pub struct PledgeFailure {
    pub pledge_id: Uuid,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(PledgeStatus::Pending.can_transition_to(PledgeStatus::Held));
        assert!(PledgeStatus::Held.can_transition_to(PledgeStatus::Captured));
        assert!(PledgeStatus::Held.can_transition_to(PledgeStatus::Refunded));
    }

    #[test]
    fn test_illegal_transitions() {
        // No shortcut from PENDING to a terminal state
        assert!(!PledgeStatus::Pending.can_transition_to(PledgeStatus::Captured));
        assert!(!PledgeStatus::Pending.can_transition_to(PledgeStatus::Refunded));

        // Re-confirmation is an error, not a no-op
        assert!(!PledgeStatus::Held.can_transition_to(PledgeStatus::Held));

        // Terminal states have no outgoing edges
        for next in [
            PledgeStatus::Pending,
            PledgeStatus::Held,
            PledgeStatus::Captured,
            PledgeStatus::Refunded,
        ] {
            assert!(!PledgeStatus::Captured.can_transition_to(next));
            assert!(!PledgeStatus::Refunded.can_transition_to(next));
        }

        // No backward edge out of HELD
        assert!(!PledgeStatus::Held.can_transition_to(PledgeStatus::Pending));
    }

    #[test]
    fn test_status_serialization_matches_api_shape() {
        let json = serde_json::to_string(&PledgeStatus::Held).unwrap();
        assert_eq!(json, "\"HELD\"");
    }
}

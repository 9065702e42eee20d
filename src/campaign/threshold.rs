//! Campaign threshold evaluation
//!
//! A pure function over the campaign's goal configuration and the amounts of
//! its currently HELD pledges. Never cached, never persisted; callers
//! recompute from the live pledge set each time.

use serde::Serialize;

use super::model::ThresholdType;

/// Result of a threshold evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdOutcome {
    /// HELD pledge count (UNITS) or HELD amount sum (DOLLARS), minor units
    pub current_funding: i64,
    pub required_funding: i64,
    pub goal_met: bool,
    /// Rounded and clamped to 0..=100, for display only. Goal determination
    /// uses the raw comparison, never this value.
    pub progress_percent: u8,
}

/// Evaluate a campaign's goal against its HELD pledge amounts.
///
/// UNITS compares the pledge count, DOLLARS the amount sum, each against the
/// threshold value. PENDING, CAPTURED, and REFUNDED pledges must not appear
/// in `held_amounts`; the caller queries HELD rows only.
pub fn evaluate(
    threshold_type: ThresholdType,
    threshold_value: i64,
    held_amounts: &[i64],
) -> ThresholdOutcome {
    let current_funding = match threshold_type {
        ThresholdType::Units => held_amounts.len() as i64,
        ThresholdType::Dollars => held_amounts.iter().sum(),
    };

    let required_funding = threshold_value;
    let goal_met = current_funding >= required_funding;

    // A zero or negative requirement is vacuously met; also avoids dividing
    // by zero below.
    let progress_percent = if required_funding <= 0 {
        100
    } else {
        ((100 * current_funding + required_funding / 2) / required_funding).clamp(0, 100) as u8
    };

    ThresholdOutcome {
        current_funding,
        required_funding,
        goal_met,
        progress_percent,
    }
}

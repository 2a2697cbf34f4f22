//! Verification state machine
//!
//! Pure functions: given a tally and the configured thresholds, decide where
//! an incident's verification state should go.

use crate::config::VerificationThresholds;
use crate::model::{Tally, VerificationState};

/// The state the votes point at, ignoring the incident's current state.
///
/// Below `min_votes` the answer is always `Unverified`.
pub fn verdict(tally: &Tally, thresholds: &VerificationThresholds) -> VerificationState {
    if tally.total() < thresholds.min_votes {
        return VerificationState::Unverified;
    }

    match tally.confirmation_ratio() {
        Some(ratio) if ratio >= thresholds.confirm_ratio => VerificationState::Verified,
        Some(ratio) if ratio <= thresholds.dispute_ratio => VerificationState::Disputed,
        _ => VerificationState::Unverified,
    }
}

/// Resolve the next state for an incident currently in `current`.
///
/// The verdict only takes effect when the transition table allows it, so a
/// settled incident stays settled and a removed one stays removed.
pub fn next_state(
    current: VerificationState,
    tally: &Tally,
    thresholds: &VerificationThresholds,
) -> VerificationState {
    let target = verdict(tally, thresholds);
    if target != current && current.can_transition_to(target) {
        target
    } else {
        current
    }
}

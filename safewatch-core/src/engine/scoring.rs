//! Reporter trust scoring
//!
//! `trust_score = verified_reports * W_verified - disputed_reports * W_disputed`
//!
//! The score is always computed from counts, never adjusted incrementally,
//! so recomputing it from the same counts gives the same value. The
//! arithmetic saturates at the `i64` bounds.

use chrono::{DateTime, Utc};

use crate::config::TrustWeights;
use crate::model::{Incident, UserId, UserProfile, VerificationState};

pub fn trust_score(verified_reports: u32, disputed_reports: u32, weights: &TrustWeights) -> i64 {
    let credit = i64::from(verified_reports).saturating_mul(weights.verified_weight);
    let penalty = i64::from(disputed_reports).saturating_mul(weights.disputed_weight);
    credit.saturating_sub(penalty)
}

/// Reputation counters derivable from a user's incidents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReputationCounts {
    pub reports: u32,
    pub verified: u32,
    pub disputed: u32,
}

impl ReputationCounts {
    /// Count `author`'s incidents by current state
    pub fn derive<'a>(author: &UserId, incidents: impl IntoIterator<Item = &'a Incident>) -> Self {
        incidents
            .into_iter()
            .filter(|incident| &incident.author == author)
            .fold(Self::default(), |mut counts, incident| {
                counts.reports += 1;
                match incident.state {
                    VerificationState::Verified => counts.verified += 1,
                    VerificationState::Disputed => counts.disputed += 1,
                    VerificationState::Unverified | VerificationState::Removed => {}
                }
                counts
            })
    }

    pub fn of(profile: &UserProfile) -> Self {
        Self {
            reports: profile.reports_count,
            verified: profile.verified_reports,
            disputed: profile.disputed_reports,
        }
    }

    pub fn score(&self, weights: &TrustWeights) -> i64 {
        trust_score(self.verified, self.disputed, weights)
    }
}

/// Overwrite a profile's counters and score. Returns whether anything changed.
pub fn apply_counts(
    profile: &mut UserProfile,
    counts: ReputationCounts,
    weights: &TrustWeights,
    now: DateTime<Utc>,
) -> bool {
    let score = counts.score(weights);
    if ReputationCounts::of(profile) == counts && profile.trust_score == score {
        return false;
    }

    profile.reports_count = counts.reports;
    profile.verified_reports = counts.verified;
    profile.disputed_reports = counts.disputed;
    profile.trust_score = score;
    profile.updated_at = now;
    true
}

/// Adjust the author's counters for one of their incidents moving from
/// `from` to `to`, then recompute the score.
pub fn apply_transition(
    profile: &mut UserProfile,
    from: VerificationState,
    to: VerificationState,
    weights: &TrustWeights,
    now: DateTime<Utc>,
) {
    let mut counts = ReputationCounts::of(profile);

    match from {
        VerificationState::Verified => counts.verified = counts.verified.saturating_sub(1),
        VerificationState::Disputed => counts.disputed = counts.disputed.saturating_sub(1),
        _ => {}
    }
    match to {
        VerificationState::Verified => counts.verified = counts.verified.saturating_add(1),
        VerificationState::Disputed => counts.disputed = counts.disputed.saturating_add(1),
        _ => {}
    }

    apply_counts(profile, counts, weights, now);
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{IncidentId, UserId};
use crate::error::EngineError;

/// Whether the voter vouches for or contests the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Confirm,
    Dispute,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Confirm => "confirm",
            VoteDirection::Dispute => "dispute",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirm" | "verify" => Ok(VoteDirection::Confirm),
            "dispute" => Ok(VoteDirection::Dispute),
            other => Err(EngineError::validation(
                "direction",
                format!("'{other}' is not one of confirm, dispute"),
            )),
        }
    }
}

/// One user's active vote on one incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVote {
    pub incident: IncidentId,
    pub voter: UserId,
    pub direction: VoteDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub cast_at: DateTime<Utc>,
}

/// Confirm/dispute counts for an incident
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub confirm: u32,
    pub dispute: u32,
}

impl Tally {
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a VerificationVote>) -> Self {
        votes.into_iter().fold(Tally::default(), |mut tally, vote| {
            match vote.direction {
                VoteDirection::Confirm => tally.confirm += 1,
                VoteDirection::Dispute => tally.dispute += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> u32 {
        self.confirm + self.dispute
    }

    /// `confirm / total`, or `None` before the first vote
    pub fn confirmation_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(f64::from(self.confirm) / f64::from(total)),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Registration data for a new reporter profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub phone: Option<String>,
    pub region: String,
}

/// Reporter profile with cached reputation counters.
///
/// The counters and `trust_score` are a cache of a pure function over the
/// incident records; see `engine::scoring`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub region: String,
    #[serde(default)]
    pub trust_score: i64,
    #[serde(default)]
    pub reports_count: u32,
    #[serde(default)]
    pub verified_reports: u32,
    #[serde(default)]
    pub disputed_reports: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(registration: NewProfile, now: DateTime<Utc>) -> Self {
        Self {
            user_id: registration.user_id,
            phone: registration.phone,
            region: registration.region,
            trust_score: 0,
            reports_count: 0,
            verified_reports: 0,
            disputed_reports: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

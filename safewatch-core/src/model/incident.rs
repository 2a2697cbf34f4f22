use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{IncidentId, UserId};
use crate::error::EngineError;

/// Mean Earth radius used for great-circle distances
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kind of safety event being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Crime,
    Accident,
    Hazard,
    PoliceInteraction,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Crime,
        Category::Accident,
        Category::Hazard,
        Category::PoliceInteraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Crime => "crime",
            Category::Accident => "accident",
            Category::Hazard => "hazard",
            Category::PoliceInteraction => "police_interaction",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "crime" => Ok(Category::Crime),
            "accident" => Ok(Category::Accident),
            "hazard" => Ok(Category::Hazard),
            "police_interaction" => Ok(Category::PoliceInteraction),
            other => Err(EngineError::validation(
                "category",
                format!("'{other}' is not one of crime, accident, hazard, police_interaction"),
            )),
        }
    }
}

/// Reported risk level, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(EngineError::validation(
                "severity",
                format!("'{other}' is not one of low, medium, high, critical"),
            )),
        }
    }
}

/// Community-validated truthfulness of an incident
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    #[default]
    Unverified,
    Verified,
    Disputed,
    /// Terminal: forced by a moderator
    Removed,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Unverified => "unverified",
            VerificationState::Verified => "verified",
            VerificationState::Disputed => "disputed",
            VerificationState::Removed => "removed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationState::Removed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Votes can only settle an unverified incident; `Verified` and
    /// `Disputed` are left only through moderator removal.
    pub fn can_transition_to(&self, next: VerificationState) -> bool {
        use VerificationState::*;
        match (self, next) {
            (Removed, _) => false,
            (_, Removed) => true,
            (Unverified, Verified) | (Unverified, Disputed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unverified" => Ok(VerificationState::Unverified),
            "verified" => Ok(VerificationState::Verified),
            "disputed" => Ok(VerificationState::Disputed),
            "removed" => Ok(VerificationState::Removed),
            other => Err(EngineError::validation(
                "state",
                format!("'{other}' is not one of unverified, verified, disputed, removed"),
            )),
        }
    }
}

/// WGS84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Caller-supplied fields of a new report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDraft {
    pub title: String,
    pub description: String,
    /// Inferred from the text when absent
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub severity: Severity,
    pub location: GeoPoint,
    #[serde(default)]
    pub address: String,
    pub region: String,
    #[serde(default)]
    pub anonymous: bool,
}

/// Moderator removal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removal {
    pub moderator: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub removed_at: DateTime<Utc>,
}

/// A single reported safety event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub location: GeoPoint,
    pub address: String,
    pub region: String,
    pub anonymous: bool,
    /// Always recorded; redacted on read when `anonymous` is set
    pub author: UserId,
    pub state: VerificationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` for incidents that never expire
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<Removal>,
}

impl Incident {
    pub fn is_removed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_accepts_both_spellings() {
        assert_eq!(
            "police-interaction".parse::<Category>().unwrap(),
            Category::PoliceInteraction
        );
        assert_eq!(
            "Police_Interaction".parse::<Category>().unwrap(),
            Category::PoliceInteraction
        );
        assert!("sos".parse::<Category>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
        assert!(matches!(
            "extreme".parse::<Severity>(),
            Err(EngineError::Validation { field: "severity", .. })
        ));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Severity::default(), Severity::Medium);
        assert_eq!(VerificationState::default(), VerificationState::Unverified);
    }

    #[test]
    fn test_transition_table() {
        use VerificationState::*;

        assert!(Unverified.can_transition_to(Verified));
        assert!(Unverified.can_transition_to(Disputed));
        assert!(Verified.can_transition_to(Removed));
        assert!(Disputed.can_transition_to(Removed));
        assert!(Unverified.can_transition_to(Removed));

        assert!(!Verified.can_transition_to(Disputed));
        assert!(!Disputed.can_transition_to(Verified));
        assert!(!Verified.can_transition_to(Unverified));
        for next in [Unverified, Verified, Disputed, Removed] {
            assert!(!Removed.can_transition_to(next));
        }
    }

    #[test]
    fn test_haversine_distance() {
        // Nairobi CBD to Jomo Kenyatta airport, roughly 15 km
        let cbd = GeoPoint::new(-1.2864, 36.8172);
        let airport = GeoPoint::new(-1.3192, 36.9278);
        let d = cbd.distance_km(&airport);
        assert!((12.0..15.0).contains(&d), "distance was {d}");
        assert_eq!(cbd.distance_km(&cbd), 0.0);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&VerificationState::Disputed).unwrap();
        assert_eq!(json, "\"disputed\"");
        let json = serde_json::to_string(&Category::PoliceInteraction).unwrap();
        assert_eq!(json, "\"police_interaction\"");
    }
}

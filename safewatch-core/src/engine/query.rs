//! Read side: redacted incident views, listings, profiles, statistics and
//! area analytics

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{
    Category, GeoPoint, Incident, IncidentId, Removal, Severity, Tally, UserId, UserProfile,
    VerificationState,
};

/// Who is reading. Anonymous authors are revealed to moderators only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Public,
    User(UserId),
    Moderator(UserId),
}

impl Viewer {
    pub fn is_moderator(&self) -> bool {
        matches!(self, Viewer::Moderator(_))
    }
}

/// Incident as presented to a particular viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentView {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub location: GeoPoint,
    pub address: String,
    pub region: String,
    pub anonymous: bool,
    /// `None` when redacted
    pub author: Option<UserId>,
    pub state: VerificationState,
    pub tally: Tally,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<Removal>,
    /// Distance from the proximity filter's centre, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl IncidentView {
    pub fn render(incident: &Incident, tally: Tally, viewer: &Viewer) -> Self {
        let author = if incident.anonymous && !viewer.is_moderator() {
            None
        } else {
            Some(incident.author)
        };

        Self {
            id: incident.id,
            title: incident.title.clone(),
            description: incident.description.clone(),
            category: incident.category,
            severity: incident.severity,
            location: incident.location,
            address: incident.address.clone(),
            region: incident.region.clone(),
            anonymous: incident.anonymous,
            author,
            state: incident.state,
            tally,
            created_at: incident.created_at,
            updated_at: incident.updated_at,
            expires_at: incident.expires_at,
            removal: incident.removal.clone(),
            distance_km: None,
        }
    }
}

/// Circle around a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    pub center: GeoPoint,
    pub radius_km: f64,
}

/// Listing criteria; every `None` field matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentFilter {
    pub severity: Option<Severity>,
    pub category: Option<Category>,
    /// Case-insensitive region name
    pub region: Option<String>,
    pub state: Option<VerificationState>,
    /// Never matches anonymous incidents unless the viewer is a moderator
    pub author: Option<UserId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring of title, description or address
    pub search: Option<String>,
    pub near: Option<Proximity>,
    pub include_expired: bool,
    /// Honoured for moderators only
    pub include_removed: bool,
    pub limit: Option<usize>,
}

impl IncidentFilter {
    /// Whether `incident` passes every criterion except proximity
    pub fn matches(&self, incident: &Incident, viewer: &Viewer, now: DateTime<Utc>) -> bool {
        if incident.is_removed() && !(self.include_removed && viewer.is_moderator()) {
            return false;
        }
        if !self.include_expired && incident.is_expired(now) {
            return false;
        }
        if self.severity.is_some_and(|s| s != incident.severity) {
            return false;
        }
        if self.category.is_some_and(|c| c != incident.category) {
            return false;
        }
        if self.state.is_some_and(|s| s != incident.state) {
            return false;
        }
        if let Some(region) = &self.region {
            if !incident.region.eq_ignore_ascii_case(region.trim()) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if &incident.author != author || (incident.anonymous && !viewer.is_moderator()) {
                return false;
            }
        }
        if self.since.is_some_and(|since| incident.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| incident.created_at > until) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&incident.title, &incident.description, &incident.address]
                .iter()
                .any(|text| text.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Profile plus derived presentation flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Score at or above the configured trusted-reporter threshold
    pub trusted: bool,
}

/// Ledger-wide counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentStats {
    pub total: usize,
    pub unverified: usize,
    pub verified: usize,
    pub disputed: usize,
    pub removed: usize,
    pub critical: usize,
    /// Filed since midnight UTC
    pub today: usize,
}

impl IncidentStats {
    pub fn collect<'a>(incidents: impl IntoIterator<Item = &'a Incident>, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        incidents.into_iter().fold(Self::default(), |mut stats, incident| {
            stats.total += 1;
            match incident.state {
                VerificationState::Unverified => stats.unverified += 1,
                VerificationState::Verified => stats.verified += 1,
                VerificationState::Disputed => stats.disputed += 1,
                VerificationState::Removed => stats.removed += 1,
            }
            if incident.severity == Severity::Critical {
                stats.critical += 1;
            }
            if incident.created_at.date_naive() == today {
                stats.today += 1;
            }
            stats
        })
    }
}

/// `days` before `now`, clamped to the earliest representable instant
fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Direction of incident volume between two equal windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    /// More than 1.5x the previous window is increasing, under 0.7x decreasing
    pub fn between(current: usize, previous: usize) -> Self {
        let (current, previous) = (current as f64, previous as f64);
        if current > previous * 1.5 {
            Trend::Increasing
        } else if current < previous * 0.7 {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Increasing => "increasing",
            Trend::Stable => "stable",
            Trend::Decreasing => "decreasing",
        })
    }
}

/// Scope of a pattern analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternQuery {
    /// Case-insensitive substring of the region or address; `None` covers everywhere
    pub area: Option<String>,
    /// Length of the analysed window and of the earlier window it is compared with
    pub window_days: i64,
    /// Incidents closer than this to a cluster's first incident join the cluster
    pub cluster_km: f64,
}

impl Default for PatternQuery {
    fn default() -> Self {
        Self {
            area: None,
            window_days: 30,
            cluster_km: 1.0,
        }
    }
}

impl PatternQuery {
    fn covers(&self, incident: &Incident) -> bool {
        match &self.area {
            None => true,
            Some(area) => {
                let needle = area.trim().to_lowercase();
                incident.region.to_lowercase().contains(&needle)
                    || incident.address.to_lowercase().contains(&needle)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
    /// High or critical
    pub severe: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    /// Hour of day, UTC
    pub hour: u32,
    pub count: usize,
}

/// Two or more incidents close together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Mean position of the member incidents
    pub center: GeoPoint,
    pub incident_count: usize,
    /// Highest severity in the cluster
    pub severity: Severity,
    pub categories: Vec<Category>,
}

impl Hotspot {
    fn from_cluster(cluster: &[&Incident]) -> Self {
        let n = cluster.len().max(1) as f64;
        let latitude = cluster.iter().map(|i| i.location.latitude).sum::<f64>() / n;
        let longitude = cluster.iter().map(|i| i.location.longitude).sum::<f64>() / n;

        Self {
            center: GeoPoint::new(latitude, longitude),
            incident_count: cluster.len(),
            severity: cluster.iter().map(|i| i.severity).max().unwrap_or_default(),
            categories: Category::ALL
                .into_iter()
                .filter(|c| cluster.iter().any(|i| i.category == *c))
                .collect(),
        }
    }
}

/// Greedy single pass: each unclaimed incident, oldest first, seeds a
/// cluster of every unclaimed incident within `cluster_km` of it.
pub fn find_hotspots(incidents: &[&Incident], cluster_km: f64) -> Vec<Hotspot> {
    let mut remaining: Vec<&Incident> = incidents.to_vec();
    remaining.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut hotspots = Vec::new();
    while !remaining.is_empty() {
        let seed = remaining.remove(0);
        let (near, far): (Vec<&Incident>, Vec<&Incident>) = remaining
            .into_iter()
            .partition(|other| seed.location.distance_km(&other.location) < cluster_km);
        remaining = far;

        if !near.is_empty() {
            let cluster: Vec<&Incident> = std::iter::once(seed).chain(near).collect();
            hotspots.push(Hotspot::from_cluster(&cluster));
        }
    }

    hotspots.sort_by(|a, b| b.incident_count.cmp(&a.incident_count));
    hotspots
}

/// What happened in an area over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPatterns {
    pub since: DateTime<Utc>,
    pub total: usize,
    /// Most frequent first
    pub by_category: Vec<CategoryCount>,
    /// Hours with at least one incident, in order
    pub by_hour: Vec<HourCount>,
    /// Incidents in the window of the same length just before `since`
    pub previous_total: usize,
    pub trend: Trend,
    pub hotspots: Vec<Hotspot>,
}

impl IncidentPatterns {
    /// Analyse the non-removed incidents `query` covers, filed in the
    /// `query.window_days` up to `now`
    pub fn detect<'a>(
        incidents: impl IntoIterator<Item = &'a Incident>,
        query: &PatternQuery,
        now: DateTime<Utc>,
    ) -> Self {
        let since = days_before(now, query.window_days);
        let previous_since = days_before(since, query.window_days);

        let mut current: Vec<&Incident> = Vec::new();
        let mut previous_total = 0;
        for incident in incidents {
            if incident.is_removed() || !query.covers(incident) {
                continue;
            }
            let at = incident.created_at;
            if at >= since && at <= now {
                current.push(incident);
            } else if at >= previous_since && at < since {
                previous_total += 1;
            }
        }

        let mut by_category: Vec<CategoryCount> = Category::ALL
            .into_iter()
            .map(|category| {
                let matching = current.iter().filter(|i| i.category == category);
                CategoryCount {
                    category,
                    count: matching.clone().count(),
                    severe: matching.filter(|i| i.severity >= Severity::High).count(),
                }
            })
            .filter(|c| c.count > 0)
            .collect();
        by_category.sort_by(|a, b| b.count.cmp(&a.count));

        let mut hours = [0usize; 24];
        for incident in &current {
            hours[incident.created_at.hour() as usize] += 1;
        }
        let by_hour = (0u32..)
            .zip(hours)
            .filter(|(_, count)| *count > 0)
            .map(|(hour, count)| HourCount { hour, count })
            .collect();

        Self {
            since,
            total: current.len(),
            by_category,
            by_hour,
            previous_total,
            trend: Trend::between(current.len(), previous_total),
            hotspots: find_hotspots(&current, query.cluster_km),
        }
    }
}

/// Days of history behind a location safety score
pub const SAFETY_WINDOW_DAYS: i64 = 30;

/// Points each nearby incident takes off a perfect score
const INCIDENT_PENALTY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Moderate,
    Caution,
    Danger,
}

impl SafetyLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            SafetyLevel::Safe
        } else if score >= 60 {
            SafetyLevel::Moderate
        } else if score >= 40 {
            SafetyLevel::Caution
        } else {
            SafetyLevel::Danger
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Moderate => "moderate",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Danger => "danger",
        })
    }
}

/// 0-100 score of a circle from its recent incidents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSafety {
    pub area: Proximity,
    pub since: DateTime<Utc>,
    pub score: u32,
    pub level: SafetyLevel,
    pub incidents: usize,
    pub critical: usize,
    pub verified: usize,
}

impl LocationSafety {
    /// Score from the non-removed incidents inside `area` filed in the last
    /// [`SAFETY_WINDOW_DAYS`] up to `now`
    pub fn assess<'a>(
        incidents: impl IntoIterator<Item = &'a Incident>,
        area: &Proximity,
        now: DateTime<Utc>,
    ) -> Self {
        let since = days_before(now, SAFETY_WINDOW_DAYS);
        let nearby: Vec<&Incident> = incidents
            .into_iter()
            .filter(|i| !i.is_removed())
            .filter(|i| i.created_at >= since && i.created_at <= now)
            .filter(|i| area.center.distance_km(&i.location) <= area.radius_km)
            .collect();

        let penalty = u32::try_from(nearby.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(INCIDENT_PENALTY);
        let score = 100u32.saturating_sub(penalty);

        Self {
            area: *area,
            since,
            score,
            level: SafetyLevel::from_score(score),
            incidents: nearby.len(),
            critical: nearby
                .iter()
                .filter(|i| i.severity == Severity::Critical)
                .count(),
            verified: nearby
                .iter()
                .filter(|i| i.state == VerificationState::Verified)
                .count(),
        }
    }
}

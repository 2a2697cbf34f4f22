//! The verification and trust engine
//!
//! [`Engine`] owns the ledger behind a single async `RwLock`. Every mutating
//! operation holds the write lock for its whole read-decide-write sequence:
//! it stages its records in a [`LedgerTxn`], commits, persists, and rolls
//! the commit back if persisting fails. Readers therefore never observe a
//! vote without the state and score it produced.
//!
//! Snapshots are written with blocking `std::fs` calls while the write lock
//! is held. A save is one small file write plus a rename, and the engine is
//! driven one command at a time, so the worker is never parked for long.
//! `block_in_place` is not used because it panics on the current-thread
//! runtime.
//!
//! Audit events are emitted after the lock is released, stamped with the
//! ledger revision their commit produced.

pub mod classify;
pub mod query;
pub mod scoring;
pub mod validation;
pub mod verification;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditSinkImpl};
use crate::config::{EngineConfig, MAX_LIFETIME_DAYS};
use crate::error::{EngineError, Result};
use crate::model::{
    Incident, IncidentDraft, IncidentId, NewProfile, Removal, Severity, Tally, UserId,
    UserProfile, VerificationState, VerificationVote, VoteDirection,
};
use crate::store::{Ledger, LedgerStore, LedgerTxn};

use query::{
    IncidentFilter, IncidentPatterns, IncidentStats, IncidentView, LocationSafety,
    PatternQuery, ProfileView, Proximity, Viewer,
};
use scoring::{apply_counts, apply_transition, ReputationCounts};
use validation::{check_location, screen_spam, validate_draft};
use verification::next_state;

/// Result of a successful `cast_vote`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub incident: IncidentId,
    pub previous_state: VerificationState,
    pub state: VerificationState,
    pub tally: Tally,
    /// Direction of the voter's earlier vote, if this one replaced it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<VoteDirection>,
}

impl VoteOutcome {
    pub fn state_changed(&self) -> bool {
        self.previous_state != self.state
    }
}

/// Result of a successful `remove_incident`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalReceipt {
    pub incident: IncidentId,
    pub previous_state: VerificationState,
    pub moderator: UserId,
    pub removed_at: DateTime<Utc>,
}

/// Result of `rebuild_profiles`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub checked: usize,
    /// Profiles whose stored counters disagreed with their incidents
    pub corrected: Vec<UserId>,
}

/// Verification and trust engine - cheap to clone, shares one ledger
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    ledger: Arc<RwLock<Ledger>>,
    store: Arc<LedgerStore>,
    audit: Arc<AuditSinkImpl>,
}

impl Engine {
    /// Validate `config` and load the ledger from `store`
    pub fn new(config: EngineConfig, store: LedgerStore, audit: AuditSinkImpl) -> Result<Self> {
        config.validate()?;
        let ledger = store.load()?;

        debug!(
            "Engine ready: {} incidents, min_votes={}, confirm_ratio={}, dispute_ratio={}",
            ledger.incident_count(),
            config.verification.min_votes,
            config.verification.confirm_ratio,
            config.verification.dispute_ratio
        );

        Ok(Self {
            config: Arc::new(config),
            ledger: Arc::new(RwLock::new(ledger)),
            store: Arc::new(store),
            audit: Arc::new(audit),
        })
    }

    /// Engine with nothing persisted and no audit trail
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::new(config, LedgerStore::Memory, AuditSinkImpl::Disabled)
    }

    /// Engine persisting to `<data_dir>/ledger.json` and auditing to `<data_dir>/audit`
    pub fn open(data_dir: &Path, config: EngineConfig) -> Result<Self> {
        info!("Opening data directory {}", data_dir.display());
        Self::new(
            config,
            LedgerStore::in_dir(data_dir),
            AuditSinkImpl::in_dir(data_dir),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Commit `txn`, persist, and undo the commit if persisting fails.
    /// Returns the ledger revision after the commit.
    fn apply(&self, ledger: &mut Ledger, txn: LedgerTxn) -> Result<u64> {
        if txn.is_empty() {
            return Ok(ledger.revision());
        }
        let undo = ledger.commit(txn);
        if let Err(e) = self.store.save(ledger) {
            ledger.rollback(undo);
            e.log_if_infrastructure();
            return Err(e);
        }
        Ok(ledger.revision())
    }

    /// Moderator viewers must have a profile, as for `remove_incident`
    fn check_viewer(ledger: &Ledger, viewer: &Viewer) -> Result<()> {
        match viewer {
            Viewer::Moderator(id) if ledger.profile(id).is_none() => {
                Err(EngineError::not_found("user", id))
            }
            _ => Ok(()),
        }
    }

    fn check_area(area: &Proximity) -> Result<()> {
        check_location(&area.center)?;
        if !area.radius_km.is_finite() || area.radius_km <= 0.0 {
            return Err(EngineError::validation(
                "radius_km",
                format!("{} must be a positive distance", area.radius_km),
            ));
        }
        Ok(())
    }

    /// Create a reporter profile
    pub async fn register_user(&self, registration: NewProfile) -> Result<UserProfile> {
        let region = registration.region.trim().to_string();
        if region.is_empty() {
            return Err(EngineError::validation("region", "must not be empty"));
        }
        let phone = registration
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let mut ledger = self.ledger.write().await;
        if ledger.profile(&registration.user_id).is_some() {
            return Err(EngineError::validation(
                "user_id",
                format!("{} is already registered", registration.user_id),
            ));
        }

        let profile = UserProfile::new(
            NewProfile {
                user_id: registration.user_id,
                phone,
                region,
            },
            Utc::now(),
        );
        let mut txn = LedgerTxn::new();
        txn.put_profile(profile.clone());
        let revision = self.apply(&mut ledger, txn)?;
        drop(ledger);

        info!(user = %profile.user_id, region = %profile.region, "User registered");
        self.audit
            .record(revision, vec![AuditEvent::UserRegistered {
                user: profile.user_id,
            }])
            .await;

        Ok(profile)
    }

    /// File a new report as `author`
    pub async fn file_report(&self, author: UserId, draft: IncidentDraft) -> Result<Incident> {
        self.file_report_at(author, draft, Utc::now()).await
    }

    /// `file_report` with an explicit clock, for replay and tests
    pub async fn file_report_at(
        &self,
        author: UserId,
        draft: IncidentDraft,
        now: DateTime<Utc>,
    ) -> Result<Incident> {
        let policy = &self.config.reports;
        let mut ledger = self.ledger.write().await;

        let mut profile = ledger
            .profile(&author)
            .cloned()
            .ok_or_else(|| EngineError::not_found("user", author))?;

        let report = validate_draft(draft, policy)?;

        let window_start = now
            .checked_sub_signed(Duration::hours(1))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let recent = ledger
            .authored_by(&author)
            .filter(|incident| incident.created_at > window_start)
            .count();
        if let Err(e) = screen_spam(&report, recent, &policy.spam) {
            warn!(author = %author, "Report screened as spam: {}", e);
            return Err(e);
        }

        let expires_at = match report.severity {
            Severity::Critical => None,
            _ => {
                let expiry = Duration::try_days(policy.lifetime_days)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        EngineError::validation(
                            "created_at",
                            format!(
                                "{now} plus {} days is past the latest representable time",
                                policy.lifetime_days
                            ),
                        )
                    })?;
                Some(expiry)
            }
        };

        let incident = Incident {
            id: IncidentId::new(),
            title: report.title,
            description: report.description,
            category: report.category,
            severity: report.severity,
            location: report.location,
            address: report.address,
            region: report.region,
            anonymous: report.anonymous,
            author,
            state: VerificationState::Unverified,
            created_at: now,
            updated_at: now,
            expires_at,
            removal: None,
        };

        let mut counts = ReputationCounts::of(&profile);
        counts.reports = counts.reports.saturating_add(1);
        apply_counts(&mut profile, counts, &self.config.trust, now);

        let mut txn = LedgerTxn::new();
        txn.put_incident(incident.clone()).put_profile(profile);
        let revision = self.apply(&mut ledger, txn)?;
        drop(ledger);

        info!(
            incident = %incident.id,
            category = %incident.category,
            severity = %incident.severity,
            "Report filed"
        );
        self.audit
            .record(revision, vec![AuditEvent::ReportFiled {
                incident: incident.id,
                author,
                category: incident.category,
                severity: incident.severity,
                anonymous: incident.anonymous,
            }])
            .await;

        Ok(incident)
    }

    /// Record `voter`'s confirm or dispute, replacing any earlier vote of
    /// theirs, and settle the incident if the thresholds are met.
    pub async fn cast_vote(
        &self,
        incident_id: IncidentId,
        voter: UserId,
        direction: VoteDirection,
        comment: Option<String>,
    ) -> Result<VoteOutcome> {
        let mut ledger = self.ledger.write().await;

        let incident = ledger
            .incident(&incident_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("incident", incident_id))?;
        if incident.is_removed() {
            return Err(EngineError::AlreadyRemoved {
                id: incident_id.to_string(),
            });
        }
        if ledger.profile(&voter).is_none() {
            return Err(EngineError::not_found("user", voter));
        }
        if incident.author == voter {
            return Err(EngineError::InvalidVote {
                reason: "authors cannot vote on their own reports".to_string(),
            });
        }

        let now = Utc::now();
        let replaced = ledger.vote(&incident_id, &voter).map(|v| v.direction);
        let vote = VerificationVote {
            incident: incident_id,
            voter,
            direction,
            comment: comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            cast_at: now,
        };

        let tally = ledger.tally_with(&vote);
        let previous_state = incident.state;
        let state = next_state(previous_state, &tally, &self.config.verification);

        let mut txn = LedgerTxn::new();
        txn.put_vote(vote);

        if state != previous_state {
            let mut settled = incident.clone();
            settled.state = state;
            settled.updated_at = now;
            txn.put_incident(settled);

            match ledger.profile(&incident.author).cloned() {
                Some(mut author) => {
                    apply_transition(&mut author, previous_state, state, &self.config.trust, now);
                    txn.put_profile(author);
                }
                None => warn!(
                    incident = %incident_id,
                    "Author {} has no profile; trust score not updated", incident.author
                ),
            }
        }

        let revision = self.apply(&mut ledger, txn)?;
        drop(ledger);

        let outcome = VoteOutcome {
            incident: incident_id,
            previous_state,
            state,
            tally,
            replaced,
        };

        debug!(
            incident = %incident_id,
            voter = %voter,
            "Vote {} recorded ({} confirm / {} dispute)", direction, tally.confirm, tally.dispute
        );

        let mut events = vec![AuditEvent::VoteCast {
            incident: incident_id,
            voter,
            direction,
            replaced,
        }];
        if outcome.state_changed() {
            info!(incident = %incident_id, "Incident {} -> {}", previous_state, state);
            events.push(AuditEvent::StateChanged {
                incident: incident_id,
                from: previous_state,
                to: state,
                tally,
            });
        }
        self.audit.record(revision, events).await;

        Ok(outcome)
    }

    /// Force an incident into `Removed`. The caller vouches that
    /// `moderator` holds the moderator role.
    pub async fn remove_incident(
        &self,
        incident_id: IncidentId,
        moderator: UserId,
        reason: Option<String>,
    ) -> Result<RemovalReceipt> {
        let mut ledger = self.ledger.write().await;

        let incident = ledger
            .incident(&incident_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("incident", incident_id))?;
        if incident.is_removed() {
            return Err(EngineError::AlreadyRemoved {
                id: incident_id.to_string(),
            });
        }
        if ledger.profile(&moderator).is_none() {
            return Err(EngineError::not_found("user", moderator));
        }

        let now = Utc::now();
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let previous_state = incident.state;

        let mut removed = incident.clone();
        removed.state = VerificationState::Removed;
        removed.updated_at = now;
        removed.removal = Some(Removal {
            moderator,
            reason: reason.clone(),
            removed_at: now,
        });

        let mut txn = LedgerTxn::new();
        txn.put_incident(removed);

        if matches!(
            previous_state,
            VerificationState::Verified | VerificationState::Disputed
        ) {
            if let Some(mut author) = ledger.profile(&incident.author).cloned() {
                apply_transition(
                    &mut author,
                    previous_state,
                    VerificationState::Removed,
                    &self.config.trust,
                    now,
                );
                txn.put_profile(author);
            }
        }

        let revision = self.apply(&mut ledger, txn)?;
        drop(ledger);

        info!(
            incident = %incident_id,
            moderator = %moderator,
            "Incident removed (was {})", previous_state
        );
        self.audit
            .record(revision, vec![AuditEvent::IncidentRemoved {
                incident: incident_id,
                moderator,
                previous: previous_state,
                reason,
            }])
            .await;

        Ok(RemovalReceipt {
            incident: incident_id,
            previous_state,
            moderator,
            removed_at: now,
        })
    }

    /// Re-derive every profile's counters and score from the incident records
    pub async fn rebuild_profiles(&self) -> Result<RebuildReport> {
        let mut ledger = self.ledger.write().await;
        let now = Utc::now();

        let mut report = RebuildReport::default();
        let mut txn = LedgerTxn::new();

        for profile in ledger.profiles() {
            report.checked += 1;
            let counts = ReputationCounts::derive(&profile.user_id, ledger.incidents());
            let mut rebuilt = profile.clone();
            if apply_counts(&mut rebuilt, counts, &self.config.trust, now) {
                warn!(
                    user = %profile.user_id,
                    "Profile drifted: score {} -> {}", profile.trust_score, rebuilt.trust_score
                );
                report.corrected.push(profile.user_id);
                txn.put_profile(rebuilt);
            }
        }

        let revision = self.apply(&mut ledger, txn)?;
        drop(ledger);

        info!(
            "Rebuilt profiles: {} checked, {} corrected",
            report.checked,
            report.corrected.len()
        );
        self.audit
            .record(revision, vec![AuditEvent::ProfilesRebuilt {
                checked: report.checked,
                corrected: report.corrected.clone(),
            }])
            .await;

        Ok(report)
    }

    /// One incident as `viewer` may see it. Removed incidents are hidden
    /// from everyone but moderators.
    pub async fn incident(&self, id: IncidentId, viewer: &Viewer) -> Result<IncidentView> {
        let ledger = self.ledger.read().await;
        Self::check_viewer(&ledger, viewer)?;
        let incident = ledger
            .incident(&id)
            .filter(|incident| !incident.is_removed() || viewer.is_moderator())
            .ok_or_else(|| EngineError::not_found("incident", id))?;

        Ok(IncidentView::render(incident, ledger.tally(&id), viewer))
    }

    pub async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        viewer: &Viewer,
    ) -> Result<Vec<IncidentView>> {
        self.list_incidents_at(filter, viewer, Utc::now()).await
    }

    /// Matching incidents, newest first, or nearest first when `filter.near` is set
    pub async fn list_incidents_at(
        &self,
        filter: &IncidentFilter,
        viewer: &Viewer,
        now: DateTime<Utc>,
    ) -> Result<Vec<IncidentView>> {
        if let Some(near) = &filter.near {
            Self::check_area(near)?;
        }

        let ledger = self.ledger.read().await;
        Self::check_viewer(&ledger, viewer)?;
        let mut views: Vec<IncidentView> = ledger
            .incidents()
            .filter(|incident| filter.matches(incident, viewer, now))
            .filter_map(|incident| {
                let distance = filter
                    .near
                    .map(|near| (near, near.center.distance_km(&incident.location)));
                if let Some((near, km)) = distance {
                    if km > near.radius_km {
                        return None;
                    }
                }
                let mut view = IncidentView::render(incident, ledger.tally(&incident.id), viewer);
                view.distance_km = distance.map(|(_, km)| km);
                Some(view)
            })
            .collect();
        drop(ledger);

        if filter.near.is_some() {
            views.sort_by(|a, b| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(Ordering::Equal)
            });
        } else {
            views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = filter.limit {
            views.truncate(limit);
        }

        Ok(views)
    }

    pub async fn profile(&self, user: UserId) -> Result<ProfileView> {
        let ledger = self.ledger.read().await;
        let profile = ledger
            .profile(&user)
            .cloned()
            .ok_or_else(|| EngineError::not_found("user", user))?;
        let trusted = profile.trust_score >= self.config.trust.trusted_reporter_score;

        Ok(ProfileView { profile, trusted })
    }

    /// Active votes on an incident, oldest first
    pub async fn votes_for(&self, incident: IncidentId) -> Result<Vec<VerificationVote>> {
        let ledger = self.ledger.read().await;
        if ledger.incident(&incident).is_none() {
            return Err(EngineError::not_found("incident", incident));
        }
        let mut votes: Vec<VerificationVote> = ledger.votes_for(&incident).cloned().collect();
        votes.sort_by(|a, b| a.cast_at.cmp(&b.cast_at));
        Ok(votes)
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> IncidentStats {
        let ledger = self.ledger.read().await;
        IncidentStats::collect(ledger.incidents(), now)
    }

    pub async fn patterns(&self, query: &PatternQuery) -> Result<IncidentPatterns> {
        self.patterns_at(query, Utc::now()).await
    }

    /// Category mix, hourly profile, trend and hotspots of recent incidents
    pub async fn patterns_at(
        &self,
        query: &PatternQuery,
        now: DateTime<Utc>,
    ) -> Result<IncidentPatterns> {
        if !(1..=MAX_LIFETIME_DAYS).contains(&query.window_days) {
            return Err(EngineError::validation(
                "window_days",
                format!("must be within [1, {MAX_LIFETIME_DAYS}] (got {})", query.window_days),
            ));
        }
        if !query.cluster_km.is_finite() || query.cluster_km <= 0.0 {
            return Err(EngineError::validation(
                "cluster_km",
                format!("{} must be a positive distance", query.cluster_km),
            ));
        }

        let ledger = self.ledger.read().await;
        let patterns = IncidentPatterns::detect(ledger.incidents(), query, now);
        debug!(
            total = patterns.total,
            hotspots = patterns.hotspots.len(),
            "Patterns since {}", patterns.since
        );
        Ok(patterns)
    }

    pub async fn location_safety(&self, area: &Proximity) -> Result<LocationSafety> {
        self.location_safety_at(area, Utc::now()).await
    }

    /// Safety score of a circle from its incidents over the last 30 days
    pub async fn location_safety_at(
        &self,
        area: &Proximity,
        now: DateTime<Utc>,
    ) -> Result<LocationSafety> {
        Self::check_area(area)?;
        let ledger = self.ledger.read().await;
        Ok(LocationSafety::assess(ledger.incidents(), area, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, GeoPoint};

    async fn engine_with_users(n: usize) -> (Engine, Vec<UserId>) {
        let engine = Engine::in_memory(EngineConfig::default()).unwrap();
        let mut users = Vec::new();
        for _ in 0..n {
            let user = UserId::new();
            engine
                .register_user(NewProfile {
                    user_id: user,
                    phone: None,
                    region: "Nairobi".into(),
                })
                .await
                .unwrap();
            users.push(user);
        }
        (engine, users)
    }

    fn draft() -> IncidentDraft {
        IncidentDraft {
            title: "Bag snatching".into(),
            description: "Phone snatched outside the bus station".into(),
            category: Some(Category::Crime),
            severity: Severity::High,
            location: GeoPoint::new(-1.2921, 36.8219),
            address: "Moi Avenue".into(),
            region: "Nairobi".into(),
            anonymous: false,
        }
    }

    #[tokio::test]
    async fn test_report_starts_unverified_and_counts() {
        let (engine, users) = engine_with_users(1).await;
        let incident = engine.file_report(users[0], draft()).await.unwrap();

        assert_eq!(incident.state, VerificationState::Unverified);
        assert!(incident.expires_at.is_some());
        assert_eq!(engine.profile(users[0]).await.unwrap().profile.reports_count, 1);
    }

    #[tokio::test]
    async fn test_critical_reports_never_expire() {
        let (engine, users) = engine_with_users(1).await;
        let mut d = draft();
        d.severity = Severity::Critical;
        let incident = engine.file_report(users[0], d).await.unwrap();
        assert_eq!(incident.expires_at, None);
    }

    #[tokio::test]
    async fn test_unknown_author_rejected() {
        let (engine, _) = engine_with_users(0).await;
        let err = engine.file_report(UserId::new(), draft()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "user", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let (engine, users) = engine_with_users(1).await;
        let err = engine
            .register_user(NewProfile {
                user_id: users[0],
                phone: None,
                region: "Nairobi".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "user_id", .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_uses_one_hour_window() {
        let (engine, users) = engine_with_users(1).await;
        let start = Utc::now();
        for i in 0..5 {
            engine
                .file_report_at(users[0], draft(), start + Duration::minutes(i))
                .await
                .unwrap();
        }
        let err = engine
            .file_report_at(users[0], draft(), start + Duration::minutes(10))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SpamDetected { .. }));

        // Oldest report has left the window
        engine
            .file_report_at(users[0], draft(), start + Duration::minutes(61))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_unverified_leaves_score_alone() {
        let (engine, users) = engine_with_users(2).await;
        let incident = engine.file_report(users[0], draft()).await.unwrap();

        let receipt = engine
            .remove_incident(incident.id, users[1], Some("duplicate".into()))
            .await
            .unwrap();
        assert_eq!(receipt.previous_state, VerificationState::Unverified);

        let profile = engine.profile(users[0]).await.unwrap().profile;
        assert_eq!(profile.trust_score, 0);
        assert_eq!(profile.reports_count, 1);
    }

    #[tokio::test]
    async fn test_expiry_beyond_calendar_rejected() {
        let (engine, users) = engine_with_users(1).await;
        let err = engine
            .file_report_at(users[0], draft(), DateTime::<Utc>::MAX_UTC)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "created_at", .. }));
        assert_eq!(engine.profile(users[0]).await.unwrap().profile.reports_count, 0);
    }

    #[tokio::test]
    async fn test_unbounded_config_refused_at_open() {
        let mut config = EngineConfig::default();
        config.reports.lifetime_days = i64::MAX;
        assert!(matches!(Engine::in_memory(config), Err(EngineError::Config(_))));

        let mut config = EngineConfig::default();
        config.trust.verified_weight = i64::MAX;
        assert!(matches!(Engine::in_memory(config), Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_largest_accepted_config_scores_without_overflow() {
        use crate::config::MAX_TRUST_WEIGHT;

        let mut config = EngineConfig::default();
        config.verification.min_votes = 1;
        config.trust.verified_weight = MAX_TRUST_WEIGHT;
        config.reports.lifetime_days = MAX_LIFETIME_DAYS;
        let engine = Engine::in_memory(config).unwrap();
        let mut users = Vec::new();
        for _ in 0..2 {
            let user = UserId::new();
            engine
                .register_user(NewProfile {
                    user_id: user,
                    phone: None,
                    region: "Nairobi".into(),
                })
                .await
                .unwrap();
            users.push(user);
        }

        for _ in 0..2 {
            let incident = engine.file_report(users[0], draft()).await.unwrap();
            assert!(incident.expires_at.is_some());
            let outcome = engine
                .cast_vote(incident.id, users[1], VoteDirection::Confirm, None)
                .await
                .unwrap();
            assert_eq!(outcome.state, VerificationState::Verified);
        }
        let profile = engine.profile(users[0]).await.unwrap().profile;
        assert_eq!(profile.trust_score, 2 * MAX_TRUST_WEIGHT);
    }

    #[tokio::test]
    async fn test_moderator_view_requires_profile() {
        let (engine, users) = engine_with_users(2).await;
        let incident = engine.file_report(users[0], draft()).await.unwrap();
        let stranger = Viewer::Moderator(UserId::new());

        let err = engine.incident(incident.id, &stranger).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "user", .. }));
        let err = engine
            .list_incidents(&IncidentFilter::default(), &stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "user", .. }));

        let moderator = Viewer::Moderator(users[1]);
        assert!(engine.incident(incident.id, &moderator).await.is_ok());
        assert_eq!(
            engine
                .list_incidents(&IncidentFilter::default(), &moderator)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_analytics_reject_bad_parameters() {
        let (engine, _) = engine_with_users(0).await;

        let query = PatternQuery {
            window_days: 0,
            ..Default::default()
        };
        let err = engine.patterns(&query).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "window_days", .. }));

        let query = PatternQuery {
            cluster_km: -1.0,
            ..Default::default()
        };
        let err = engine.patterns(&query).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "cluster_km", .. }));

        let area = Proximity {
            center: GeoPoint::new(-1.2921, 36.8219),
            radius_km: 0.0,
        };
        let err = engine.location_safety(&area).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "radius_km", .. }));

        let area = Proximity {
            center: GeoPoint::new(91.0, 36.8219),
            radius_km: 5.0,
        };
        assert!(engine.location_safety(&area).await.is_err());
    }
}

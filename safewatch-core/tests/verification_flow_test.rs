mod common;

use common::{draft, init_test_logging, register, register_many};
use pretty_assertions::assert_eq;
use safewatch_core::config::VerificationThresholds;
use safewatch_core::engine::query::Viewer;
use safewatch_core::model::{Tally, UserId, VerificationState, VoteDirection};
use safewatch_core::{Engine, EngineConfig, EngineError};

use VoteDirection::{Confirm, Dispute};

fn engine() -> Engine {
    init_test_logging();
    Engine::in_memory(EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn test_two_confirms_below_minimum_stay_unverified() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 2).await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    for voter in &voters {
        let outcome = engine.cast_vote(incident.id, *voter, Confirm, None).await.unwrap();
        assert_eq!(outcome.state, VerificationState::Unverified);
        assert!(!outcome.state_changed());
    }

    let view = engine.incident(incident.id, &Viewer::Public).await.unwrap();
    assert_eq!(view.state, VerificationState::Unverified);
    assert_eq!(view.tally, Tally { confirm: 2, dispute: 0 });
}

#[tokio::test]
async fn test_two_confirms_one_dispute_verifies_and_credits_author() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 3).await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    engine.cast_vote(incident.id, voters[0], Confirm, None).await.unwrap();
    engine.cast_vote(incident.id, voters[1], Dispute, None).await.unwrap();
    let outcome = engine.cast_vote(incident.id, voters[2], Confirm, None).await.unwrap();

    assert_eq!(outcome.previous_state, VerificationState::Unverified);
    assert_eq!(outcome.state, VerificationState::Verified);
    assert_eq!(outcome.tally, Tally { confirm: 2, dispute: 1 });

    let profile = engine.profile(author).await.unwrap().profile;
    assert_eq!(profile.verified_reports, 1);
    assert_eq!(profile.trust_score, 10);
}

#[tokio::test]
async fn test_dispute_majority_penalizes_author() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 3).await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    for voter in &voters {
        engine.cast_vote(incident.id, *voter, Dispute, None).await.unwrap();
    }

    let view = engine.incident(incident.id, &Viewer::Public).await.unwrap();
    assert_eq!(view.state, VerificationState::Disputed);

    let profile = engine.profile(author).await.unwrap().profile;
    assert_eq!(profile.disputed_reports, 1);
    assert_eq!(profile.trust_score, -5);
}

#[tokio::test]
async fn test_author_cannot_vote_on_own_report() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    let err = engine
        .cast_vote(incident.id, author, Confirm, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidVote { .. }));

    // Nothing was recorded
    assert!(engine.votes_for(incident.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vote_on_removed_incident_rejected() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let moderator = register(&engine, "Nairobi").await;
    let voter = register(&engine, "Nairobi").await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    engine
        .remove_incident(incident.id, moderator, Some("hoax".into()))
        .await
        .unwrap();

    let err = engine
        .cast_vote(incident.id, voter, Confirm, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRemoved { .. }));

    let err = engine
        .remove_incident(incident.id, moderator, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRemoved { .. }));
}

#[tokio::test]
async fn test_unknown_incident_and_voter() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    let err = engine
        .cast_vote(incident.id, UserId::new(), Confirm, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "user", .. }));

    let voter = register(&engine, "Nairobi").await;
    let err = engine
        .cast_vote(safewatch_core::model::IncidentId::new(), voter, Confirm, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "incident", .. }));
}

#[tokio::test]
async fn test_revote_replaces_instead_of_adding() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voter = register(&engine, "Nairobi").await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    let first = engine.cast_vote(incident.id, voter, Confirm, None).await.unwrap();
    assert_eq!(first.replaced, None);

    let second = engine
        .cast_vote(incident.id, voter, Dispute, Some("  it was a scuffle  ".into()))
        .await
        .unwrap();
    assert_eq!(second.replaced, Some(Confirm));
    assert_eq!(second.tally, Tally { confirm: 0, dispute: 1 });

    let votes = engine.votes_for(incident.id).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].direction, Dispute);
    assert_eq!(votes[0].comment.as_deref(), Some("it was a scuffle"));
}

#[tokio::test]
async fn test_settled_incident_records_later_votes_without_moving() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 6).await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    for voter in &voters[..3] {
        engine.cast_vote(incident.id, *voter, Confirm, None).await.unwrap();
    }
    for voter in &voters[3..] {
        let outcome = engine.cast_vote(incident.id, *voter, Dispute, None).await.unwrap();
        assert_eq!(outcome.state, VerificationState::Verified);
    }

    let view = engine.incident(incident.id, &Viewer::Public).await.unwrap();
    assert_eq!(view.tally, Tally { confirm: 3, dispute: 3 });
    assert_eq!(engine.profile(author).await.unwrap().profile.trust_score, 10);
}

#[tokio::test]
async fn test_removing_verified_report_takes_back_credit() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let moderator = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 3).await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    for voter in &voters {
        engine.cast_vote(incident.id, *voter, Confirm, None).await.unwrap();
    }
    assert_eq!(engine.profile(author).await.unwrap().profile.trust_score, 10);

    let receipt = engine
        .remove_incident(incident.id, moderator, None)
        .await
        .unwrap();
    assert_eq!(receipt.previous_state, VerificationState::Verified);

    let profile = engine.profile(author).await.unwrap().profile;
    assert_eq!(profile.verified_reports, 0);
    assert_eq!(profile.trust_score, 0);
    assert_eq!(profile.reports_count, 1);
}

#[tokio::test]
async fn test_configured_thresholds_apply() {
    init_test_logging();
    let config = EngineConfig {
        verification: VerificationThresholds {
            min_votes: 1,
            confirm_ratio: 1.0,
            dispute_ratio: 0.0,
        },
        ..EngineConfig::default()
    };
    let engine = Engine::in_memory(config).unwrap();
    let author = register(&engine, "Nairobi").await;
    let voter = register(&engine, "Nairobi").await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();

    let outcome = engine.cast_vote(incident.id, voter, Confirm, None).await.unwrap();
    assert_eq!(outcome.state, VerificationState::Verified);
}

#[tokio::test]
async fn test_trusted_flag_follows_threshold() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 3).await;

    assert!(!engine.profile(author).await.unwrap().trusted);

    for i in 0..5 {
        let incident = engine
            .file_report(author, draft(&format!("Bag snatching {i}")))
            .await
            .unwrap();
        for voter in &voters {
            engine.cast_vote(incident.id, *voter, Confirm, None).await.unwrap();
        }
    }

    let view = engine.profile(author).await.unwrap();
    assert_eq!(view.profile.trust_score, 50);
    assert!(view.trusted);
}

#[tokio::test]
async fn test_rebuild_on_consistent_ledger_corrects_nothing() {
    let engine = engine();
    let author = register(&engine, "Nairobi").await;
    let voters = register_many(&engine, 3).await;
    let incident = engine.file_report(author, draft("Bag snatching")).await.unwrap();
    for voter in &voters {
        engine.cast_vote(incident.id, *voter, Dispute, None).await.unwrap();
    }

    let before = engine.profile(author).await.unwrap();
    let report = engine.rebuild_profiles().await.unwrap();
    assert_eq!(report.checked, 4);
    assert!(report.corrected.is_empty());
    assert_eq!(engine.profile(author).await.unwrap(), before);
}

#[tokio::test]
async fn test_invalid_config_refused() {
    let mut config = EngineConfig::default();
    config.verification.dispute_ratio = 0.9;
    assert!(matches!(
        Engine::in_memory(config),
        Err(EngineError::Config(_))
    ));
}

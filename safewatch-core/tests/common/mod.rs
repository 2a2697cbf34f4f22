//! Shared helpers for engine integration tests

#![allow(dead_code)]

use safewatch_core::model::{Category, GeoPoint, IncidentDraft, NewProfile, Severity, UserId};
use safewatch_core::Engine;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Register a fresh user in `region`
pub async fn register(engine: &Engine, region: &str) -> UserId {
    let user = UserId::new();
    engine
        .register_user(NewProfile {
            user_id: user,
            phone: None,
            region: region.to_string(),
        })
        .await
        .unwrap();
    user
}

/// Register `n` fresh users in Nairobi
pub async fn register_many(engine: &Engine, n: usize) -> Vec<UserId> {
    let mut users = Vec::with_capacity(n);
    for _ in 0..n {
        users.push(register(engine, "Nairobi").await);
    }
    users
}

/// A valid crime report in central Nairobi
pub fn draft(title: &str) -> IncidentDraft {
    IncidentDraft {
        title: title.to_string(),
        description: "Two men on a motorbike grabbed a handbag".to_string(),
        category: Some(Category::Crime),
        severity: Severity::High,
        location: GeoPoint::new(-1.2864, 36.8172),
        address: "Kenyatta Avenue".to_string(),
        region: "Nairobi".to_string(),
        anonymous: false,
    }
}

//! Engine configuration
//!
//! Every threshold and weight the engine uses is configuration rather than a
//! constant. Values are read from YAML; any omitted field falls back to its
//! default, so an empty file is a valid configuration.
//!
//! ```yaml
//! verification:
//!   min_votes: 3
//!   confirm_ratio: 0.66
//!   dispute_ratio: 0.33
//! trust:
//!   verified_weight: 10
//!   disputed_weight: 5
//!   trusted_reporter_score: 50
//! reports:
//!   min_title_len: 5
//!   min_description_len: 10
//!   lifetime_days: 30
//!   spam:
//!     max_reports_per_hour: 5
//!     phrases: ["make money", "click here"]
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub use loader::{ConfigSource, LoadedConfig};

/// Longest accepted report lifetime (about a century)
pub const MAX_LIFETIME_DAYS: i64 = 36_500;

/// Largest accepted trust weight
pub const MAX_TRUST_WEIGHT: i64 = 1_000_000;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub verification: VerificationThresholds,
    pub trust: TrustWeights,
    pub reports: ReportPolicy,
}

/// Vote thresholds driving the verification state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationThresholds {
    /// Votes required before any verdict is reached
    pub min_votes: u32,
    /// Ratio at or above which an incident becomes verified
    pub confirm_ratio: f64,
    /// Ratio at or below which an incident becomes disputed
    pub dispute_ratio: f64,
}

impl Default for VerificationThresholds {
    fn default() -> Self {
        Self {
            min_votes: 3,
            confirm_ratio: 0.66,
            dispute_ratio: 0.33,
        }
    }
}

/// Weights of the trust score function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustWeights {
    pub verified_weight: i64,
    pub disputed_weight: i64,
    /// Score from which a reporter is shown as trusted (informational only)
    pub trusted_reporter_score: i64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            verified_weight: 10,
            disputed_weight: 5,
            trusted_reporter_score: 50,
        }
    }
}

/// Submission rules applied by `file_report`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPolicy {
    pub min_title_len: usize,
    pub min_description_len: usize,
    /// Days until a non-critical incident expires from default listings
    pub lifetime_days: i64,
    pub spam: SpamPolicy,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            min_title_len: 5,
            min_description_len: 10,
            lifetime_days: 30,
            spam: SpamPolicy::default(),
        }
    }
}

/// Spam screening rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamPolicy {
    /// Reports one author may file within a rolling hour; 0 disables the limit
    pub max_reports_per_hour: u32,
    /// Case-insensitive phrases that mark a description as spam
    pub phrases: Vec<String>,
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self {
            max_reports_per_hour: 5,
            phrases: ["make money", "earn cash", "click here", "http://", "www."]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Parse YAML and validate the result
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // serde_yaml_ng rejects an empty document; treat it as all defaults
        let config: EngineConfig = if content.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml_ng::from_str(content)
                .map_err(|e| EngineError::Config(format!("invalid YAML: {e}")))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| EngineError::Config(format!("failed to render YAML: {e}")))
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let v = &self.verification;
        if v.min_votes == 0 {
            return Err(EngineError::Config(
                "verification.min_votes must be at least 1".into(),
            ));
        }
        for (name, ratio) in [
            ("confirm_ratio", v.confirm_ratio),
            ("dispute_ratio", v.dispute_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(EngineError::Config(format!(
                    "verification.{name} must be within [0, 1] (got {ratio})"
                )));
            }
        }
        if v.dispute_ratio >= v.confirm_ratio {
            return Err(EngineError::Config(format!(
                "verification.dispute_ratio ({}) must be below confirm_ratio ({})",
                v.dispute_ratio, v.confirm_ratio
            )));
        }

        let t = &self.trust;
        for (name, weight) in [
            ("verified_weight", t.verified_weight),
            ("disputed_weight", t.disputed_weight),
        ] {
            if !(0..=MAX_TRUST_WEIGHT).contains(&weight) {
                return Err(EngineError::Config(format!(
                    "trust.{name} must be within [0, {MAX_TRUST_WEIGHT}] (got {weight})"
                )));
            }
        }

        let lifetime = self.reports.lifetime_days;
        if !(1..=MAX_LIFETIME_DAYS).contains(&lifetime) {
            return Err(EngineError::Config(format!(
                "reports.lifetime_days must be within [1, {MAX_LIFETIME_DAYS}] (got {lifetime})"
            )));
        }

        Ok(())
    }
}

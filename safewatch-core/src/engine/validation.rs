//! Report validation and spam screening

use crate::config::{ReportPolicy, SpamPolicy};
use crate::error::{EngineError, Result};
use crate::model::{Category, GeoPoint, IncidentDraft, Severity};

use super::classify::infer_category;

/// A draft that passed validation, with text trimmed and category resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReport {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub location: GeoPoint,
    pub address: String,
    pub region: String,
    pub anonymous: bool,
}

/// Check every field of a draft, failing on the first invalid one
pub fn validate_draft(draft: IncidentDraft, policy: &ReportPolicy) -> Result<ValidatedReport> {
    let title = draft.title.trim().to_string();
    let description = draft.description.trim().to_string();

    check_text("title", &title, policy.min_title_len)?;
    check_text("description", &description, policy.min_description_len)?;

    let category = match draft.category {
        Some(category) => category,
        None => infer_category(&title, &description).ok_or_else(|| {
            EngineError::validation(
                "category",
                "no category given and none could be inferred from the report text",
            )
        })?,
    };

    check_location(&draft.location)?;

    let region = draft.region.trim().to_string();
    if region.is_empty() {
        return Err(EngineError::validation("region", "must not be empty"));
    }

    Ok(ValidatedReport {
        title,
        description,
        category,
        severity: draft.severity,
        location: draft.location,
        address: draft.address.trim().to_string(),
        region,
        anonymous: draft.anonymous,
    })
}

fn check_text(field: &'static str, value: &str, min_len: usize) -> Result<()> {
    if value.is_empty() {
        return Err(EngineError::validation(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len < min_len {
        return Err(EngineError::validation(
            field,
            format!("must be at least {min_len} characters (got {len})"),
        ));
    }
    Ok(())
}

pub fn check_location(point: &GeoPoint) -> Result<()> {
    if !point.latitude.is_finite() || !(-90.0..=90.0).contains(&point.latitude) {
        return Err(EngineError::validation(
            "latitude",
            format!("{} is outside [-90, 90]", point.latitude),
        ));
    }
    if !point.longitude.is_finite() || !(-180.0..=180.0).contains(&point.longitude) {
        return Err(EngineError::validation(
            "longitude",
            format!("{} is outside [-180, 180]", point.longitude),
        ));
    }
    Ok(())
}

/// Reject a report whose author is flooding the feed or whose text looks
/// like advertising. `recent_reports` is the author's count in the last hour.
pub fn screen_spam(report: &ValidatedReport, recent_reports: usize, policy: &SpamPolicy) -> Result<()> {
    let limit = policy.max_reports_per_hour as usize;
    if limit > 0 && recent_reports >= limit {
        return Err(EngineError::SpamDetected {
            reason: format!("{recent_reports} reports already filed in the last hour (limit {limit})"),
        });
    }

    let description = report.description.to_lowercase();
    if let Some(phrase) = policy
        .phrases
        .iter()
        .find(|phrase| !phrase.is_empty() && description.contains(&phrase.to_lowercase()))
    {
        return Err(EngineError::SpamDetected {
            reason: format!("description contains '{phrase}'"),
        });
    }

    Ok(())
}

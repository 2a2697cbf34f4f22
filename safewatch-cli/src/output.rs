//! Rendering of command results as tables or JSON

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use safewatch_core::engine::query::{IncidentPatterns, IncidentStats, IncidentView, ProfileView};
use safewatch_core::model::VerificationVote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn short_id(id: impl ToString) -> String {
    let id = id.to_string();
    id.chars().take(8).collect()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// Table row structure for incident listings
#[derive(Tabled)]
struct IncidentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Votes")]
    votes: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Filed")]
    filed: String,
    #[tabled(rename = "Km")]
    distance: String,
}

impl From<&IncidentView> for IncidentRow {
    fn from(view: &IncidentView) -> Self {
        Self {
            id: short_id(view.id),
            title: truncate(&view.title, 32),
            category: view.category.to_string(),
            severity: view.severity.to_string(),
            state: view.state.to_string(),
            votes: format!("+{} / -{}", view.tally.confirm, view.tally.dispute),
            region: view.region.clone(),
            filed: view.created_at.format("%Y-%m-%d %H:%M").to_string(),
            distance: view
                .distance_km
                .map(|km| format!("{km:.1}"))
                .unwrap_or_default(),
        }
    }
}

pub fn print_incident_table(views: &[IncidentView]) {
    if views.is_empty() {
        println!("No incidents match.");
        return;
    }

    let rows: Vec<IncidentRow> = views.iter().map(IncidentRow::from).collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    println!("{} incident(s)", views.len());
}

pub fn print_incident(view: &IncidentView) {
    println!("Incident {}", view.id);
    println!("  Title:       {}", view.title);
    println!("  Description: {}", view.description);
    println!("  Category:    {}", view.category);
    println!("  Severity:    {}", view.severity);
    println!(
        "  Location:    {:.5}, {:.5} {}",
        view.location.latitude, view.location.longitude, view.address
    );
    println!("  Region:      {}", view.region);
    match view.author {
        Some(author) => println!("  Author:      {author}"),
        None => println!("  Author:      (anonymous)"),
    }
    println!(
        "  State:       {} (+{} / -{})",
        view.state, view.tally.confirm, view.tally.dispute
    );
    println!("  Filed:       {}", view.created_at.to_rfc3339());
    if let Some(expires_at) = view.expires_at {
        println!("  Expires:     {}", expires_at.to_rfc3339());
    }
    if let Some(removal) = &view.removal {
        println!(
            "  Removed:     {} by {} ({})",
            removal.removed_at.to_rfc3339(),
            removal.moderator,
            removal.reason.as_deref().unwrap_or("no reason given")
        );
    }
}

#[derive(Tabled)]
struct VoteRow {
    #[tabled(rename = "Voter")]
    voter: String,
    #[tabled(rename = "Vote")]
    direction: String,
    #[tabled(rename = "Cast")]
    cast_at: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

pub fn print_votes(votes: &[VerificationVote]) {
    if votes.is_empty() {
        println!("  No votes yet.");
        return;
    }

    let rows: Vec<VoteRow> = votes
        .iter()
        .map(|vote| VoteRow {
            voter: short_id(vote.voter),
            direction: vote.direction.to_string(),
            cast_at: vote.cast_at.format("%Y-%m-%d %H:%M").to_string(),
            comment: vote.comment.clone().unwrap_or_default(),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub fn print_profile(view: &ProfileView) {
    let p = &view.profile;
    println!("User {}", p.user_id);
    println!("  Region:       {}", p.region);
    if let Some(phone) = &p.phone {
        println!("  Phone:        {phone}");
    }
    println!(
        "  Trust score:  {}{}",
        p.trust_score,
        if view.trusted { " (trusted reporter)" } else { "" }
    );
    println!(
        "  Reports:      {} filed, {} verified, {} disputed",
        p.reports_count, p.verified_reports, p.disputed_reports
    );
    println!("  Member since: {}", p.created_at.format("%Y-%m-%d"));
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Count")]
    count: usize,
}

pub fn print_stats(stats: &IncidentStats) {
    let rows = [
        ("Total", stats.total),
        ("Unverified", stats.unverified),
        ("Verified", stats.verified),
        ("Disputed", stats.disputed),
        ("Removed", stats.removed),
        ("Critical", stats.critical),
        ("Filed today", stats.today),
    ]
    .map(|(metric, count)| StatRow { metric, count });

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "High/Critical")]
    severe: usize,
}

#[derive(Tabled)]
struct HotspotRow {
    #[tabled(rename = "Centre")]
    center: String,
    #[tabled(rename = "Incidents")]
    incidents: usize,
    #[tabled(rename = "Worst")]
    severity: String,
    #[tabled(rename = "Categories")]
    categories: String,
}

pub fn print_patterns(patterns: &IncidentPatterns) {
    println!(
        "{} incident(s) since {} ({} in the window before, {})",
        patterns.total,
        patterns.since.format("%Y-%m-%d"),
        patterns.previous_total,
        patterns.trend
    );
    if patterns.total == 0 {
        return;
    }

    let rows: Vec<CategoryRow> = patterns
        .by_category
        .iter()
        .map(|c| CategoryRow {
            category: c.category.to_string(),
            count: c.count,
            severe: c.severe,
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    let busiest = patterns.by_hour.iter().max_by_key(|h| h.count);
    if let Some(hour) = busiest {
        println!("Busiest hour: {:02}:00 UTC ({} incident(s))", hour.hour, hour.count);
    }

    if patterns.hotspots.is_empty() {
        println!("No hotspots.");
        return;
    }
    let rows: Vec<HotspotRow> = patterns
        .hotspots
        .iter()
        .map(|spot| HotspotRow {
            center: format!("{:.4}, {:.4}", spot.center.latitude, spot.center.longitude),
            incidents: spot.incident_count,
            severity: spot.severity.to_string(),
            categories: spot
                .categories
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Überfall am Bahnhof", 6), "Überf…");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0192f1c4-7b2e-7cc1-a000-000000000000"), "0192f1c4");
    }
}

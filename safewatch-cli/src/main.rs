//! SafeWatch - community incident verification and reporter trust
//!
//! Command-line front end over `safewatch-core`. Every command opens the
//! data directory, resolves configuration, and drives one engine operation.
//! Logs go to stderr; stdout carries only command output.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use safewatch_core::config::loader::write_default_config;
use safewatch_core::config::LoadedConfig;
use safewatch_core::engine::query::{IncidentFilter, PatternQuery, Proximity, Viewer};
use safewatch_core::model::{
    Category, GeoPoint, IncidentDraft, IncidentId, Severity, UserId, VerificationState,
    VoteDirection,
};
use safewatch_core::Engine;

mod config_cli;
mod output;
mod user_cli;

use output::OutputFormat;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "safewatch",
    about = "Verification and trust engine for community incident reports",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Directory holding the ledger, audit trail and project config
    #[clap(long, default_value = ".safewatch", global = true)]
    data_dir: PathBuf,

    /// Use this configuration file instead of discovering one
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    log_json: bool,

    /// Output format for command results
    #[clap(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
enum Command {
    /// Write a default config.yml into the data directory
    Init {
        /// Overwrite an existing config.yml
        #[clap(long)]
        force: bool,
    },

    /// Register and inspect reporter profiles
    User {
        #[clap(subcommand)]
        command: user_cli::UserCommand,
    },

    /// File a new incident report
    Report {
        /// Reporting user
        #[clap(long)]
        author: UserId,

        #[clap(long)]
        title: String,

        #[clap(long)]
        description: String,

        /// crime, accident, hazard or police_interaction (inferred when omitted)
        #[clap(long)]
        category: Option<Category>,

        #[clap(long, default_value = "medium")]
        severity: Severity,

        #[clap(long, allow_negative_numbers = true)]
        lat: f64,

        #[clap(long, allow_negative_numbers = true)]
        lng: f64,

        #[clap(long, default_value = "")]
        address: String,

        #[clap(long)]
        region: String,

        /// Hide the author from everyone but moderators
        #[clap(long)]
        anonymous: bool,
    },

    /// Confirm or dispute an incident
    Vote {
        incident: IncidentId,

        /// confirm or dispute
        direction: VoteDirection,

        #[clap(long)]
        voter: UserId,

        #[clap(long)]
        comment: Option<String>,
    },

    /// Remove an incident (moderators only)
    Remove {
        incident: IncidentId,

        #[clap(long)]
        moderator: UserId,

        #[clap(long)]
        reason: Option<String>,
    },

    /// Show one incident
    Show {
        incident: IncidentId,

        /// View as this moderator (reveals anonymous authors and removed incidents)
        #[clap(long)]
        moderator: Option<UserId>,

        /// Include the individual votes
        #[clap(long)]
        votes: bool,
    },

    /// List incidents, newest first or nearest first with --near-lat/--near-lng
    List(ListArgs),

    /// Incident totals
    Stats,

    /// Category mix, busiest hours, trend and hotspots of recent incidents
    Patterns {
        /// Region or address text to restrict the analysis to
        #[clap(long)]
        area: Option<String>,

        /// Window length in days, compared with the window before it
        #[clap(long, default_value_t = 30)]
        days: i64,

        /// Incidents this close to each other form a hotspot
        #[clap(long, default_value_t = 1.0)]
        cluster_km: f64,
    },

    /// Safety score of an area from its incidents over the last 30 days
    Safety {
        #[clap(long, allow_negative_numbers = true)]
        lat: f64,

        #[clap(long, allow_negative_numbers = true)]
        lng: f64,

        #[clap(long, default_value_t = 5.0)]
        radius_km: f64,
    },

    /// Recompute every profile's counters and trust score from the incidents
    Rebuild,

    /// Inspect the active configuration
    Config {
        #[clap(subcommand)]
        command: config_cli::ConfigCommand,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ListArgs {
    #[clap(long)]
    severity: Option<Severity>,

    #[clap(long)]
    category: Option<Category>,

    #[clap(long)]
    region: Option<String>,

    #[clap(long)]
    state: Option<VerificationState>,

    #[clap(long)]
    author: Option<UserId>,

    /// Created at or after (RFC 3339)
    #[clap(long)]
    since: Option<DateTime<Utc>>,

    /// Created at or before (RFC 3339)
    #[clap(long)]
    until: Option<DateTime<Utc>>,

    /// Text to look for in title, description and address
    #[clap(long)]
    search: Option<String>,

    #[clap(long, allow_negative_numbers = true, requires = "near_lng")]
    near_lat: Option<f64>,

    #[clap(long, allow_negative_numbers = true, requires = "near_lat")]
    near_lng: Option<f64>,

    /// Search radius for --near-lat/--near-lng
    #[clap(long, default_value_t = 5.0)]
    radius_km: f64,

    #[clap(long)]
    include_expired: bool,

    /// Include removed incidents (requires --moderator)
    #[clap(long, requires = "moderator")]
    include_removed: bool,

    #[clap(long)]
    limit: Option<usize>,

    /// View as this moderator
    #[clap(long)]
    moderator: Option<UserId>,
}

impl ListArgs {
    fn viewer(&self) -> Viewer {
        match self.moderator {
            Some(id) => Viewer::Moderator(id),
            None => Viewer::Public,
        }
    }

    fn to_filter(&self) -> IncidentFilter {
        let near = match (self.near_lat, self.near_lng) {
            (Some(lat), Some(lng)) => Some(Proximity {
                center: GeoPoint::new(lat, lng),
                radius_km: self.radius_km,
            }),
            _ => None,
        };

        IncidentFilter {
            severity: self.severity,
            category: self.category,
            region: self.region.clone(),
            state: self.state,
            author: self.author,
            since: self.since,
            until: self.until,
            search: self.search.clone(),
            near,
            include_expired: self.include_expired,
            include_removed: self.include_removed,
            limit: self.limit,
        }
    }
}

/// Initialize tracing with CLI flags
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    // RUST_LOG, when set, wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Resolve configuration and open the engine over `data_dir`
pub(crate) fn open_engine(data_dir: &Path, config: Option<&Path>) -> Result<Engine> {
    let loaded = LoadedConfig::discover(data_dir, config)?;
    debug!("Using configuration from {}", loaded.source);

    Engine::open(data_dir, loaded.config)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.log_json);

    let data_dir = cli.data_dir.as_path();
    let config = cli.config.as_deref();
    let format = cli.format;

    match cli.command {
        Command::Init { force } => init_command(data_dir, force),
        Command::User { command } => command.execute(data_dir, config, format).await,
        Command::Report {
            author,
            title,
            description,
            category,
            severity,
            lat,
            lng,
            address,
            region,
            anonymous,
        } => {
            let draft = IncidentDraft {
                title,
                description,
                category,
                severity,
                location: GeoPoint::new(lat, lng),
                address,
                region,
                anonymous,
            };
            report_command(data_dir, config, format, author, draft).await
        }
        Command::Vote {
            incident,
            direction,
            voter,
            comment,
        } => vote_command(data_dir, config, format, incident, voter, direction, comment).await,
        Command::Remove {
            incident,
            moderator,
            reason,
        } => remove_command(data_dir, config, format, incident, moderator, reason).await,
        Command::Show {
            incident,
            moderator,
            votes,
        } => show_command(data_dir, config, format, incident, moderator, votes).await,
        Command::List(args) => list_command(data_dir, config, format, &args).await,
        Command::Stats => stats_command(data_dir, config, format).await,
        Command::Patterns {
            area,
            days,
            cluster_km,
        } => {
            let query = PatternQuery {
                area,
                window_days: days,
                cluster_km,
            };
            patterns_command(data_dir, config, format, &query).await
        }
        Command::Safety {
            lat,
            lng,
            radius_km,
        } => {
            let area = Proximity {
                center: GeoPoint::new(lat, lng),
                radius_km,
            };
            safety_command(data_dir, config, format, &area).await
        }
        Command::Rebuild => rebuild_command(data_dir, config, format).await,
        Command::Config { command } => command.execute(data_dir, config),
    }
}

fn init_command(data_dir: &Path, force: bool) -> Result<()> {
    let path = write_default_config(data_dir, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn report_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    author: UserId,
    draft: IncidentDraft,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let incident = engine
        .file_report(author, draft)
        .await
        .context("Report rejected")?;

    match format {
        OutputFormat::Json => output::print_json(&incident),
        OutputFormat::Table => {
            println!("Filed incident {}", incident.id);
            println!("  category: {}  severity: {}", incident.category, incident.severity);
            if let Some(expires_at) = incident.expires_at {
                println!("  expires:  {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
            }
            Ok(())
        }
    }
}

async fn vote_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    incident: IncidentId,
    voter: UserId,
    direction: VoteDirection,
    comment: Option<String>,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let outcome = engine
        .cast_vote(incident, voter, direction, comment)
        .await
        .context("Vote rejected")?;

    match format {
        OutputFormat::Json => output::print_json(&outcome),
        OutputFormat::Table => {
            let verb = if outcome.replaced.is_some() {
                "Changed vote to"
            } else {
                "Recorded"
            };
            println!(
                "{verb} {direction} ({} confirm / {} dispute)",
                outcome.tally.confirm, outcome.tally.dispute
            );
            if outcome.state_changed() {
                println!("Incident is now {}", outcome.state);
            }
            Ok(())
        }
    }
}

async fn remove_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    incident: IncidentId,
    moderator: UserId,
    reason: Option<String>,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let receipt = engine
        .remove_incident(incident, moderator, reason)
        .await
        .context("Removal rejected")?;

    match format {
        OutputFormat::Json => output::print_json(&receipt),
        OutputFormat::Table => {
            println!(
                "Removed incident {} (was {})",
                receipt.incident, receipt.previous_state
            );
            Ok(())
        }
    }
}

async fn show_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    incident: IncidentId,
    moderator: Option<UserId>,
    with_votes: bool,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let viewer = moderator.map_or(Viewer::Public, Viewer::Moderator);
    let view = engine.incident(incident, &viewer).await?;
    let votes = if with_votes {
        engine.votes_for(incident).await?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Json if with_votes => output::print_json(&serde_json::json!({
            "incident": view,
            "votes": votes,
        })),
        OutputFormat::Json => output::print_json(&view),
        OutputFormat::Table => {
            output::print_incident(&view);
            if with_votes {
                output::print_votes(&votes);
            }
            Ok(())
        }
    }
}

async fn list_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    args: &ListArgs,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let views = engine
        .list_incidents(&args.to_filter(), &args.viewer())
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&views),
        OutputFormat::Table => {
            output::print_incident_table(&views);
            Ok(())
        }
    }
}

async fn stats_command(data_dir: &Path, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let stats = engine.stats(Utc::now()).await;

    match format {
        OutputFormat::Json => output::print_json(&stats),
        OutputFormat::Table => {
            output::print_stats(&stats);
            Ok(())
        }
    }
}

async fn patterns_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    query: &PatternQuery,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let patterns = engine.patterns(query).await.context("Analysis rejected")?;

    match format {
        OutputFormat::Json => output::print_json(&patterns),
        OutputFormat::Table => {
            output::print_patterns(&patterns);
            Ok(())
        }
    }
}

async fn safety_command(
    data_dir: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    area: &Proximity,
) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let safety = engine
        .location_safety(area)
        .await
        .context("Assessment rejected")?;

    match format {
        OutputFormat::Json => output::print_json(&safety),
        OutputFormat::Table => {
            println!(
                "Safety score {} ({}) within {} km of {:.5}, {:.5}",
                safety.score,
                safety.level,
                safety.area.radius_km,
                safety.area.center.latitude,
                safety.area.center.longitude
            );
            println!(
                "  {} incident(s) since {}: {} critical, {} verified",
                safety.incidents,
                safety.since.format("%Y-%m-%d"),
                safety.critical,
                safety.verified
            );
            Ok(())
        }
    }
}

async fn rebuild_command(data_dir: &Path, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let engine = open_engine(data_dir, config)?;
    let report = engine.rebuild_profiles().await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            println!(
                "Checked {} profiles, corrected {}",
                report.checked,
                report.corrected.len()
            );
            for user in &report.corrected {
                println!("  {user}");
            }
            Ok(())
        }
    }
}

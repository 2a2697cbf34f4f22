//! Audit trail of engine events
//!
//! Every committed operation emits an [`AuditEvent`]. Sinks write one JSON
//! record per line; the file sink rotates daily.
//!
//! Records are written after the ledger lock is released, so concurrent
//! operations may interleave their lines. Each record carries the ledger
//! revision its operation committed; sort by `revision` to recover commit
//! order. Events of one operation share a revision and keep their relative
//! order.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{EngineError, Result};
use crate::model::{
    Category, IncidentId, Severity, Tally, UserId, VerificationState, VoteDirection,
};

/// Something the engine did that moderators may need to review later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    UserRegistered {
        user: UserId,
    },
    ReportFiled {
        incident: IncidentId,
        author: UserId,
        category: Category,
        severity: Severity,
        anonymous: bool,
    },
    VoteCast {
        incident: IncidentId,
        voter: UserId,
        direction: VoteDirection,
        #[serde(skip_serializing_if = "Option::is_none")]
        replaced: Option<VoteDirection>,
    },
    StateChanged {
        incident: IncidentId,
        from: VerificationState,
        to: VerificationState,
        tally: Tally,
    },
    IncidentRemoved {
        incident: IncidentId,
        moderator: UserId,
        previous: VerificationState,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ProfilesRebuilt {
        checked: usize,
        corrected: Vec<UserId>,
    },
}

/// A timestamped audit line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Ledger revision produced by the operation
    #[serde(default)]
    pub revision: u64,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditRecord {
    pub fn now(revision: u64, event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            revision,
            event,
        }
    }
}

/// Trait for audit log sinks
pub trait AuditSink: Send + Sync {
    /// Write an audit record
    fn write(&self, record: &AuditRecord) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Writes JSON records to stdout
pub struct StdoutSink;

impl AuditSink for StdoutSink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        println!("{}", serde_json::to_string(record)?);
        Ok(())
    }
}

/// Appends JSON lines to `{base_path}/events-YYYYMMDD.jsonl`
pub struct FileSink {
    base_path: PathBuf,
}

impl FileSink {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Audit file for the current local date
    pub fn current_file(&self) -> PathBuf {
        let date = Local::now().format("%Y%m%d").to_string();
        self.base_path.join(format!("events-{date}.jsonl"))
    }
}

impl AuditSink for FileSink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        let file_path = self.current_file();
        let storage_err = |source| EngineError::Storage {
            path: file_path.clone(),
            source,
        };

        create_dir_all(&self.base_path).await.map_err(storage_err)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await
            .map_err(storage_err)?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        file.write_all(line.as_bytes()).await.map_err(storage_err)?;
        file.flush().await.map_err(storage_err)?;

        Ok(())
    }
}

/// Enum wrapper for audit sinks to enable dynamic dispatch with async methods
pub enum AuditSinkImpl {
    Disabled,
    Stdout(StdoutSink),
    File(FileSink),
}

impl AuditSinkImpl {
    /// File sink under `<data_dir>/audit`
    pub fn in_dir(data_dir: &std::path::Path) -> Self {
        AuditSinkImpl::File(FileSink::new(data_dir.join("audit")))
    }

    pub async fn write(&self, record: &AuditRecord) -> Result<()> {
        match self {
            AuditSinkImpl::Disabled => Ok(()),
            AuditSinkImpl::Stdout(sink) => sink.write(record).await,
            AuditSinkImpl::File(sink) => sink.write(record).await,
        }
    }

    /// Record events after a commit. Audit failures are logged, never
    /// propagated: the ledger is already the source of truth.
    pub async fn record(&self, revision: u64, events: Vec<AuditEvent>) {
        for event in events {
            if let Err(e) = self.write(&AuditRecord::now(revision, event)).await {
                tracing::warn!("Failed to write audit record: {}", e);
            }
        }
    }
}

/// Read every record from a JSONL audit file, skipping malformed lines
pub async fn read_records(path: &std::path::Path) -> Result<Vec<AuditRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::Storage {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Skipping malformed audit line: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn removal_event() -> AuditEvent {
        AuditEvent::IncidentRemoved {
            incident: IncidentId::new(),
            moderator: UserId::new(),
            previous: VerificationState::Verified,
            reason: Some("duplicate".into()),
        }
    }

    #[tokio::test]
    async fn test_stdout_sink() {
        let sink = StdoutSink;
        // Should not panic
        sink.write(&AuditRecord::now(1, removal_event())).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_sink_creation() {
        let temp_dir = tempdir().unwrap();
        let sink = FileSink::new(temp_dir.path().join("audit"));

        sink.write(&AuditRecord::now(1, removal_event())).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(temp_dir.path().join("audit"))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(files.len(), 1);
        let name = files[0].file_name().to_string_lossy().to_string();
        assert!(name.starts_with("events-"));
        assert!(name.ends_with(".jsonl"));

        let content = std::fs::read_to_string(files[0].path()).unwrap();
        assert!(content.contains("\"event\":\"incident_removed\""));
        assert!(content.contains("\"reason\":\"duplicate\""));
    }

    #[tokio::test]
    async fn test_file_sink_append_and_read_back() {
        let temp_dir = tempdir().unwrap();
        let sink = AuditSinkImpl::File(FileSink::new(temp_dir.path().to_path_buf()));

        let user = UserId::new();
        sink.record(4, vec![
            AuditEvent::UserRegistered { user },
            removal_event(),
            AuditEvent::ProfilesRebuilt {
                checked: 3,
                corrected: vec![],
            },
        ])
        .await;

        let path = match &sink {
            AuditSinkImpl::File(file) => file.current_file(),
            _ => unreachable!(),
        };
        let records = read_records(&path).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.revision == 4));
        assert_eq!(records[0].event, AuditEvent::UserRegistered { user });
        assert!(matches!(records[2].event, AuditEvent::ProfilesRebuilt { checked: 3, .. }));
    }

    #[tokio::test]
    async fn test_disabled_sink_writes_nothing() {
        AuditSinkImpl::Disabled
            .write(&AuditRecord::now(1, removal_event()))
            .await
            .unwrap();
    }
}

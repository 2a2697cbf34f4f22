//! Ledger persistence
//!
//! The ledger is kept in memory and written back as a whole after every
//! committed operation. File snapshots go to a sibling temp file first and
//! are renamed into place, so a crash never leaves a half-written ledger.

pub mod ledger;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EngineError, Result};

pub use ledger::{Ledger, LedgerTxn, Undo};

/// File name of the ledger snapshot inside a data directory
pub const LEDGER_FILE_NAME: &str = "ledger.json";

/// Where committed ledgers are persisted
#[derive(Debug, Clone)]
pub enum LedgerStore {
    /// Nothing is persisted (tests, dry runs)
    Memory,
    /// JSON snapshot on disk
    File(LedgerFile),
}

impl LedgerStore {
    /// File store at `<data_dir>/ledger.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        LedgerStore::File(LedgerFile::new(data_dir.join(LEDGER_FILE_NAME)))
    }

    pub fn load(&self) -> Result<Ledger> {
        match self {
            LedgerStore::Memory => Ok(Ledger::new()),
            LedgerStore::File(file) => file.load(),
        }
    }

    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        match self {
            LedgerStore::Memory => Ok(()),
            LedgerStore::File(file) => file.save(ledger),
        }
    }
}

/// JSON snapshot of the ledger
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or an empty ledger if none has been written yet
    pub fn load(&self) -> Result<Ledger> {
        if !self.path.exists() {
            debug!("No ledger at {} - starting empty", self.path.display());
            return Ok(Ledger::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| EngineError::Storage {
            path: self.path.clone(),
            source,
        })?;
        let ledger: Ledger = serde_json::from_str(&content)?;
        info!(
            "Loaded ledger from {} ({} incidents)",
            self.path.display(),
            ledger.incident_count()
        );
        Ok(ledger)
    }

    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(storage_error(parent))?;
        }

        let content = serde_json::to_string_pretty(ledger)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(storage_error(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(storage_error(&self.path))?;

        debug!("Ledger saved to {}", self.path.display());
        Ok(())
    }
}

fn storage_error(path: &Path) -> impl FnOnce(std::io::Error) -> EngineError {
    let path = path.to_path_buf();
    move |source| EngineError::Storage { path, source }
}

//! Configuration discovery
//!
//! Resolution order:
//! 1. Explicit path (CLI `--config`)
//! 2. Project config: `<data-dir>/config.yml`
//! 3. Global config: `<platform config dir>/safewatch/config.yml`
//! 4. Built-in defaults
//!
//! Only the first file found is used; files are not merged.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::EngineConfig;

/// File name of the configuration inside a data or global directory
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Project(PathBuf),
    Global(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Project(p) | ConfigSource::Global(p) => {
                Some(p)
            }
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "explicit ({})", p.display()),
            ConfigSource::Project(p) => write!(f, "project ({})", p.display()),
            ConfigSource::Global(p) => write!(f, "global ({})", p.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// A validated configuration and its origin
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    /// Discover and load configuration for a data directory
    pub fn discover(data_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let global_dir = global_config_dir();
        Self::discover_with_global(data_dir, explicit, global_dir.as_deref())
    }

    /// Discovery with an injectable global directory
    pub fn discover_with_global(
        data_dir: &Path,
        explicit: Option<&Path>,
        global_dir: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(anyhow!("Config file does not exist: {}", path.display()));
            }
            debug!("Using explicit --config override: {}", path.display());
            return Self::load_file(path, ConfigSource::Explicit(path.to_path_buf()));
        }

        let project = data_dir.join(CONFIG_FILE_NAME);
        if project.is_file() {
            return Self::load_file(&project, ConfigSource::Project(project.clone()));
        }

        if let Some(global_dir) = global_dir {
            let global = global_dir.join(CONFIG_FILE_NAME);
            if global.is_file() {
                return Self::load_file(&global, ConfigSource::Global(global.clone()));
            }
        }

        debug!("No configuration file found - using built-in defaults");
        Ok(Self {
            config: EngineConfig::default(),
            source: ConfigSource::Defaults,
        })
    }

    fn load_file(path: &Path, source: ConfigSource) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = EngineConfig::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", source);
        Ok(Self { config, source })
    }
}

/// Platform-specific global directory, e.g. `~/.config/safewatch` on Linux
pub fn global_config_dir() -> Option<PathBuf> {
    use directories::ProjectDirs;

    ProjectDirs::from("", "", "safewatch").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Write the default configuration into `data_dir`, refusing to overwrite
/// an existing file unless `force` is set. Returns the written path.
pub fn write_default_config(data_dir: &Path, force: bool) -> Result<PathBuf> {
    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(anyhow!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        ));
    }

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    let yaml = EngineConfig::default().to_yaml()?;
    let content = format!("# SafeWatch engine configuration\n{yaml}");
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default configuration to {}", path.display());
    Ok(path)
}

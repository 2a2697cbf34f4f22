//! Configuration inspection commands

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use safewatch_core::config::LoadedConfig;

#[derive(Parser, Debug)]
pub enum ConfigCommand {
    /// Print the active configuration as YAML
    Show,

    /// Load and validate the configuration without touching the ledger
    Validate,
}

impl ConfigCommand {
    pub fn execute(&self, data_dir: &Path, config: Option<&Path>) -> Result<()> {
        let loaded = LoadedConfig::discover(data_dir, config)?;

        match self {
            ConfigCommand::Show => {
                println!("# source: {}", loaded.source);
                print!("{}", loaded.config.to_yaml()?);
            }
            ConfigCommand::Validate => {
                println!("Configuration OK ({})", loaded.source);
            }
        }
        Ok(())
    }
}

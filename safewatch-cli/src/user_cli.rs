//! Reporter profile commands: register, show

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use safewatch_core::model::{NewProfile, UserId};

use crate::open_engine;
use crate::output::{self, OutputFormat};

#[derive(Parser, Debug)]
pub enum UserCommand {
    /// Create a profile for a user of the identity provider
    Register {
        /// Identity-provider user id (a new one is generated when omitted)
        #[clap(long)]
        id: Option<UserId>,

        #[clap(long)]
        region: String,

        #[clap(long)]
        phone: Option<String>,
    },

    /// Show a profile with its trust score
    Show { user: UserId },
}

impl UserCommand {
    pub async fn execute(
        self,
        data_dir: &Path,
        config: Option<&Path>,
        format: OutputFormat,
    ) -> Result<()> {
        let engine = open_engine(data_dir, config)?;

        match self {
            UserCommand::Register { id, region, phone } => {
                let user_id = id.unwrap_or_default();
                let profile = engine
                    .register_user(NewProfile {
                        user_id,
                        phone,
                        region,
                    })
                    .await
                    .context("Registration rejected")?;

                match format {
                    OutputFormat::Json => output::print_json(&profile),
                    OutputFormat::Table => {
                        println!("Registered user {}", profile.user_id);
                        Ok(())
                    }
                }
            }
            UserCommand::Show { user } => {
                let view = engine.profile(user).await?;
                match format {
                    OutputFormat::Json => output::print_json(&view),
                    OutputFormat::Table => {
                        output::print_profile(&view);
                        Ok(())
                    }
                }
            }
        }
    }
}

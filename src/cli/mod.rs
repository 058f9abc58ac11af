//! CLI module for Leadflow
//!
//! Commands:
//! - `check`: validate the configuration and print the flow table
//! - `simulate`: replay a lead script against an in-memory store
//! - `route`: apply one trigger to a stored conversation
//! - `history`: show a stored conversation and its handoffs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod check;
pub mod conversation;
pub mod simulate;

/// Leadflow CLI
#[derive(Parser, Debug)]
#[command(name = "leadflow")]
#[command(about = "Handoff orchestration for AI sales agents")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file, applied after config/*.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and print the flow table
    Check,
    /// Replay a lead script (JSON or TOML)
    Simulate {
        /// Script file
        script: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a trigger to a stored conversation
    Route {
        /// Conversation id
        conversation: String,
        /// Trigger name
        trigger: String,
    },
    /// Show a conversation, or list conversations when no id is given
    History {
        /// Conversation id
        conversation: Option<String>,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = crate::app::load_config(cli.config.as_deref())?;
    match cli.command {
        Some(Commands::Check) => check::run(&config),
        Some(Commands::Simulate { script, json }) => simulate::run(&config, &script, json).await,
        Some(Commands::Route {
            conversation: id,
            trigger,
        }) => conversation::route(&config, &id, &trigger).await,
        Some(Commands::History { conversation: id }) => {
            conversation::history(&config, id.as_deref()).await
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

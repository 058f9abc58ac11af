//! Leadflow - SDR handoff orchestration
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use leadflow_core::format_error_for_cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadflow=info,leadflow_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    match cli::run(cli).await {
        Err(e) => match e.downcast_ref::<leadflow_core::Error>() {
            Some(core) => {
                eprint!("{}", format_error_for_cli(core));
                std::process::exit(1);
            }
            None => Err(e),
        },
        ok => ok,
    }
}

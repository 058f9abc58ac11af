//! `leadflow simulate`

use crate::app::{build_engine, load_table, AppConfig};
use leadflow_core::{LeadScript, MemoryStore, Simulator};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config: &AppConfig, script: &Path, json: bool) -> anyhow::Result<()> {
    let script = LeadScript::load(script)?;
    let table = load_table(config)?;
    // simulations never touch the configured store
    let engine = build_engine(config, table, Arc::new(MemoryStore::new()))?;

    let report = Simulator::with_engine(engine).run(&script).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

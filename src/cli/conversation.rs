//! `leadflow route` and `leadflow history`

use crate::app::{build_engine, init_store, load_table, AppConfig};
use leadflow_core::{ConversationStore, FlowEngine, TransitionOutcome};

async fn engine(config: &AppConfig) -> anyhow::Result<FlowEngine> {
    let table = load_table(config)?;
    let store = init_store(config).await?;
    build_engine(config, table, store)
}

pub async fn route(config: &AppConfig, conversation: &str, trigger: &str) -> anyhow::Result<()> {
    let engine = engine(config).await?;
    let outcome = engine
        .router()
        .apply(conversation, trigger)
        .await
        .map_err(leadflow_core::Error::from)?;

    match &outcome {
        TransitionOutcome::Applied { record, .. } => {
            println!("{}: {} -> {} ({})", conversation, record.from, record.to, record.trigger);
        }
        TransitionOutcome::Unchanged { state, .. } => {
            println!("{}: already owned by {}", conversation, state.current_role);
        }
        TransitionOutcome::Suppressed { state, reason } => {
            println!("{}: ignored, {}", conversation, reason.to_error(state, trigger));
        }
    }
    Ok(())
}

pub async fn history(config: &AppConfig, conversation: Option<&str>) -> anyhow::Result<()> {
    let engine = engine(config).await?;

    let Some(id) = conversation else {
        let ids = engine
            .store()
            .list_conversations()
            .await
            .map_err(leadflow_core::Error::from)?;
        if ids.is_empty() {
            println!("No conversations stored");
        }
        for id in ids {
            println!("{id}");
        }
        return Ok(());
    };

    let (state, records) = engine.history(id).await?;
    println!("Conversation {}", state.id);
    if let Some(lead) = &state.lead_id {
        println!("  lead: {lead}");
    }
    println!(
        "  role: {} ({})",
        state.current_role,
        if state.is_closed() { "closed" } else { "open" }
    );
    println!("  created: {}", state.created_at.to_rfc3339());
    println!("  updated: {}", state.updated_at.to_rfc3339());
    if !state.fields.is_empty() {
        println!("  fields:");
        for (key, value) in &state.fields {
            println!("    {key} = {value}");
        }
    }
    println!("  messages: {}", state.transcript.len());
    println!("  handoffs:");
    if records.is_empty() {
        println!("    none");
    }
    for record in records {
        println!(
            "    {}  {} -> {}  ({})",
            record.occurred_at.to_rfc3339(),
            record.from,
            record.to,
            record.trigger
        );
    }
    Ok(())
}

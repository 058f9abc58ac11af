//! `leadflow check`

use crate::app::{config::StoreBackend, load_table, AppConfig};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let table = load_table(config)?;

    println!("Flow table OK");
    println!("  initial role: {}", table.initial_role());
    println!(
        "  closing triggers: won = {}, lost = {}",
        table.closing_trigger(true).unwrap_or("-"),
        table.closing_trigger(false).unwrap_or("-")
    );

    println!("\nTriggers (by precedence):");
    let mut triggers: Vec<_> = table.triggers().iter().collect();
    triggers.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.declared_at.cmp(&b.declared_at)));
    for trigger in triggers {
        let mut rules = Vec::new();
        if !trigger.keywords.is_empty() {
            rules.push(format!("{} keywords", trigger.keywords.len()));
        }
        if !trigger.patterns.is_empty() {
            rules.push(format!("{} patterns", trigger.patterns.len()));
        }
        if !trigger.fields.is_empty() {
            rules.push(format!("{} fields", trigger.fields.len()));
        }
        println!(
            "  {:>4}  {:<32} {}",
            trigger.priority,
            trigger.name,
            if rules.is_empty() { "classifier only".to_string() } else { rules.join(", ") }
        );
    }

    println!("\nTransitions:");
    for row in table.rows() {
        let from = row.from.map_or("*", |r| r.as_str());
        println!("  {:<18} --[{}]--> {}", from, row.trigger, row.to);
    }

    println!("\nRoles:");
    for (role, profile) in table.roles().iter() {
        println!("  {:<18} {} (prompt: {})", role, profile.display_name, profile.prompt_key);
    }

    println!();
    match config.store.backend {
        StoreBackend::Memory => println!("Store: memory"),
        StoreBackend::Sqlite => println!(
            "Store: sqlite ({})",
            config.store.path.as_deref().unwrap_or("~/.leadflow/leadflow.db")
        ),
    }
    println!(
        "Classifier: {}",
        if config.detector.llm.enabled { "llm" } else { "rules only" }
    );
    Ok(())
}

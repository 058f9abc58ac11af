//! Lead scripts
//!
//! A [`LeadScript`] is a canned conversation: lead messages (with optional
//! qualification fields), agent replies and an optional close. The
//! [`Simulator`] replays it through a [`FlowEngine`] backed by an in-memory
//! store and reports which agent owned each turn.
//!
//! ```toml
//! conversation_id = "demo-1"
//!
//! [[steps]]
//! kind = "lead"
//! text = "Looks good but it's too expensive"
//!
//! [[steps]]
//! kind = "agent"
//! text = "We have an annual plan"
//!
//! [[steps]]
//! kind = "close"
//! won = true
//! ```

mod report;
mod script;

pub use report::{SimulationReport, TurnReport};
pub use script::{LeadScript, ScriptStep};

use crate::conversation::Speaker;
use crate::detector::TriggerDetector;
use crate::engine::{FlowEngine, InboundMessage};
use crate::error::Result;
use crate::flow::FlowTable;
use crate::router::{FlowRouter, TransitionOutcome};
use crate::store::MemoryStore;
use std::sync::Arc;
use tracing::info;

/// Replays lead scripts
pub struct Simulator {
    engine: FlowEngine,
}

impl Simulator {
    /// Rule-only simulator over a fresh in-memory store
    #[must_use]
    pub fn new(table: Arc<FlowTable>) -> Self {
        let detector = Arc::new(TriggerDetector::new(table.clone()));
        let router = FlowRouter::new(table, Arc::new(MemoryStore::new()));
        Self::with_engine(FlowEngine::new(detector, router))
    }

    /// Simulator over a preconfigured engine
    #[must_use]
    pub fn with_engine(engine: FlowEngine) -> Self {
        Self { engine }
    }

    /// Underlying engine
    #[must_use]
    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    /// Run every step of `script`
    pub async fn run(&self, script: &LeadScript) -> Result<SimulationReport> {
        let id = script.conversation_id.as_str();
        let mut turns = Vec::with_capacity(script.steps.len());

        for (step, entry) in script.steps.iter().enumerate() {
            let turn = match entry {
                ScriptStep::Lead { text, fields } => {
                    let mut message = InboundMessage::new(id, text.as_str());
                    message.fields = fields.clone();
                    message.lead_id = script.lead_id.clone();
                    message.initial_role = script.initial_role;
                    let outcome = self.engine.handle_message(message).await?;
                    TurnReport {
                        step,
                        speaker: Speaker::Lead,
                        text: text.clone(),
                        active_role: outcome.active_role,
                        matched: outcome.matches.iter().map(|m| m.trigger.clone()).collect(),
                        transition: outcome.transition,
                        note: outcome
                            .degraded
                            .map(|e| e.to_string())
                            .or_else(|| outcome.suppressed.map(|r| format!("{r:?}"))),
                    }
                }
                ScriptStep::Agent { text } => {
                    let state = self.engine.record_agent_reply(id, text).await?;
                    TurnReport {
                        step,
                        speaker: Speaker::Agent,
                        text: text.clone(),
                        active_role: state.current_role,
                        matched: Vec::new(),
                        transition: None,
                        note: None,
                    }
                }
                ScriptStep::Close { won } => {
                    let outcome = self.engine.close(id, *won).await?;
                    let note = match &outcome {
                        TransitionOutcome::Suppressed { reason, .. } => Some(format!("{reason:?}")),
                        _ => None,
                    };
                    TurnReport {
                        step,
                        speaker: Speaker::Agent,
                        text: if *won { "[close: won]" } else { "[close: lost]" }.to_string(),
                        active_role: outcome.state().current_role,
                        matched: Vec::new(),
                        transition: outcome.record().cloned(),
                        note,
                    }
                }
            };
            turns.push(turn);
        }

        let (state, transitions) = self.engine.history(id).await?;
        info!(
            conversation_id = id,
            turns = turns.len(),
            handoffs = transitions.len(),
            final_role = %state.current_role,
            "Simulation finished"
        );

        Ok(SimulationReport {
            conversation_id: state.id,
            final_role: state.current_role,
            closed: state.status == crate::conversation::ConversationStatus::Closed,
            history: state.history,
            turns,
            transitions,
        })
    }
}

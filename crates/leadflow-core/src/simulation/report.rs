use crate::conversation::{Speaker, TransitionRecord};
use crate::role::AgentRole;
use serde::Serialize;
use std::fmt;

/// One replayed step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    /// Step index in the script
    pub step: usize,
    /// Who spoke
    pub speaker: Speaker,
    /// Message text
    pub text: String,
    /// Role owning the conversation after the step
    pub active_role: AgentRole,
    /// Triggers matched on this step, best first
    pub matched: Vec<String>,
    /// Handoff committed on this step
    pub transition: Option<TransitionRecord>,
    /// Suppression or degradation note
    pub note: Option<String>,
}

/// Result of a script run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    /// Conversation id
    pub conversation_id: String,
    /// Per-step results
    pub turns: Vec<TurnReport>,
    /// Role at the end of the run
    pub final_role: AgentRole,
    /// Whether the conversation ended closed
    pub closed: bool,
    /// Prior roles, oldest first
    pub history: Vec<AgentRole>,
    /// Committed transition records
    pub transitions: Vec<TransitionRecord>,
}

impl SimulationReport {
    /// Roles in the order they owned the conversation
    #[must_use]
    pub fn role_path(&self) -> Vec<AgentRole> {
        let mut path = self.history.clone();
        path.push(self.final_role);
        path
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conversation {}", self.conversation_id)?;
        for turn in &self.turns {
            let who = match turn.speaker {
                Speaker::Lead => "lead ",
                Speaker::Agent => "agent",
            };
            writeln!(f, "  #{:<2} {} [{}] {}", turn.step, who, turn.active_role, turn.text)?;
            if !turn.matched.is_empty() {
                writeln!(f, "       matched: {}", turn.matched.join(", "))?;
            }
            if let Some(record) = &turn.transition {
                writeln!(
                    f,
                    "       handoff: {} -> {} ({})",
                    record.from, record.to, record.trigger
                )?;
            }
            if let Some(note) = &turn.note {
                writeln!(f, "       note: {note}")?;
            }
        }
        let path: Vec<&str> = self.role_path().iter().map(|r| r.as_str()).collect();
        writeln!(f, "Path: {}", path.join(" -> "))?;
        write!(
            f,
            "Handoffs: {}, closed: {}",
            self.transitions.len(),
            if self.closed { "yes" } else { "no" }
        )
    }
}

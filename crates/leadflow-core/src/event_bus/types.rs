use crate::conversation::TransitionRecord;
use crate::role::AgentRole;
use serde::Serialize;

/// Routing events.
///
/// Events carry ids, roles and trigger names only; transcripts and
/// qualification fields stay in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// A handoff was committed
    TransitionApplied {
        /// The committed record
        record: TransitionRecord,
    },
    /// A trigger arrived for a closed conversation and was ignored
    TransitionSuppressed {
        /// Conversation id
        conversation_id: String,
        /// Terminal role of the conversation
        role: AgentRole,
        /// Trigger name
        trigger: String,
    },
    /// A trigger has no table entry for the current role
    InvalidTransition {
        /// Conversation id
        conversation_id: String,
        /// Current role
        role: AgentRole,
        /// Trigger name
        trigger: String,
    },
    /// Commit kept failing and was abandoned
    TransitionFailed {
        /// Conversation id
        conversation_id: String,
        /// Trigger name
        trigger: String,
        /// Attempts made
        attempts: u32,
    },
}

impl FlowEvent {
    /// Conversation the event belongs to
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::TransitionApplied { record } => &record.conversation_id,
            Self::TransitionSuppressed {
                conversation_id, ..
            }
            | Self::InvalidTransition {
                conversation_id, ..
            }
            | Self::TransitionFailed {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

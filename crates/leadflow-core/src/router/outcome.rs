use crate::conversation::{ConversationState, TransitionRecord};
use crate::error::HandoffError;
use serde::Serialize;

/// Why a matched trigger left the state untouched on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    /// The table routes to the role that already owns the conversation
    SelfTransition,
}

/// Why a matched trigger was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// The conversation is closed
    TerminalStateViolation,
    /// The table has no entry for (current role, trigger)
    InvalidTransition,
}

impl SuppressionReason {
    /// The taxonomy error this suppression stands for
    #[must_use]
    pub fn to_error(self, state: &ConversationState, trigger: &str) -> HandoffError {
        match self {
            Self::TerminalStateViolation => HandoffError::TerminalStateViolation {
                conversation_id: state.id.clone(),
                role: state.current_role,
                trigger: trigger.to_string(),
            },
            Self::InvalidTransition => HandoffError::InvalidTransition {
                from: state.current_role,
                trigger: trigger.to_string(),
            },
        }
    }
}

/// Result of applying one trigger
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Role changed and the record was committed
    Applied {
        /// State after the handoff
        state: ConversationState,
        /// Committed record
        record: TransitionRecord,
    },
    /// No-op
    Unchanged {
        /// Current state
        state: ConversationState,
        /// Why
        reason: UnchangedReason,
    },
    /// Ignored; the state is unchanged
    Suppressed {
        /// Current state
        state: ConversationState,
        /// Why
        reason: SuppressionReason,
    },
}

impl TransitionOutcome {
    /// State after the call
    #[must_use]
    pub fn state(&self) -> &ConversationState {
        match self {
            Self::Applied { state, .. }
            | Self::Unchanged { state, .. }
            | Self::Suppressed { state, .. } => state,
        }
    }

    /// Consume into the state after the call
    #[must_use]
    pub fn into_state(self) -> ConversationState {
        match self {
            Self::Applied { state, .. }
            | Self::Unchanged { state, .. }
            | Self::Suppressed { state, .. } => state,
        }
    }

    /// Committed record, if any
    #[must_use]
    pub fn record(&self) -> Option<&TransitionRecord> {
        match self {
            Self::Applied { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Whether a handoff happened
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

//! Error types for leadflow-core
//!
//! [`HandoffError`] is the handoff taxonomy. None of its variants reach a
//! lead-facing channel: the engine always degrades to "continue with the
//! current agent". [`Error`] wraps everything a caller of the crate can see.

use crate::flow::ConfigError;
use crate::role::AgentRole;
use crate::store::StoreError;
use thiserror::Error;

/// Handoff failure taxonomy
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandoffError {
    /// The delegated classifier could not evaluate the context
    #[error("classification unavailable from {classifier}: {reason}")]
    ClassificationUnavailable {
        /// Classifier name
        classifier: String,
        /// Timeout, transport error, or malformed output
        reason: String,
    },

    /// A trigger matched but no table entry exists for the current role
    #[error("no transition for trigger '{trigger}' from role {from}")]
    InvalidTransition {
        /// Current role
        from: AgentRole,
        /// Trigger name
        trigger: String,
    },

    /// Compare-and-set kept failing after bounded retries
    #[error("conversation {conversation_id} changed concurrently; gave up after {attempts} attempts")]
    PersistenceConflict {
        /// Conversation id
        conversation_id: String,
        /// Attempts made
        attempts: u32,
    },

    /// Trigger received for a conversation already in a terminal role
    #[error("conversation {conversation_id} is closed as {role}; trigger '{trigger}' ignored")]
    TerminalStateViolation {
        /// Conversation id
        conversation_id: String,
        /// Terminal role
        role: AgentRole,
        /// Trigger name
        trigger: String,
    },

    /// Conversation does not exist
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// Non-conflict storage failure
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Flow table or application configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Handoff failed
    #[error("handoff error: {0}")]
    Handoff(#[from] HandoffError),

    /// Storage failed
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Simulation script could not be read or parsed
    #[error("script error: {0}")]
    Script(String),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Config(e) => format!("Flow configuration is invalid: {}", e),
            Error::Handoff(HandoffError::PersistenceConflict { conversation_id, .. }) => {
                format!("Conversation {} is being updated elsewhere.", conversation_id)
            }
            Error::Handoff(HandoffError::ConversationNotFound(id)) => {
                format!("Conversation {} does not exist.", id)
            }
            Error::Handoff(e) => format!("Handoff not applied: {}", e),
            Error::Store(e) => format!("Storage problem: {}", e),
            Error::Script(msg) => format!("Lead script problem: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Config(_) => {
                Some("Run `leadflow check` to see the offending table entry.".to_string())
            }
            Error::Handoff(HandoffError::PersistenceConflict { .. }) => {
                Some("Retry once the other writer has finished.".to_string())
            }
            Error::Handoff(HandoffError::ConversationNotFound(_)) => {
                Some("Use `leadflow history` to list stored conversations.".to_string())
            }
            Error::Store(_) => Some("Check the [store] section of the configuration.".to_string()),
            Error::Script(_) => {
                Some("Scripts are JSON or TOML with `conversation_id` and `steps`.".to_string())
            }
            Error::Handoff(_) => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push_str("\n\n");
        output.push_str(&suggestion);
    }
    output.push('\n');
    output
}

#[cfg(test)]
mod tests;

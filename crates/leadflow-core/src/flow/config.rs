//! Serialized form of the flow table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Flow configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Role identifier is not one of the known roles
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// Initial role must not be terminal
    #[error("initial role '{0}' is terminal")]
    TerminalInitialRole(String),

    /// Trigger declared twice
    #[error("trigger '{0}' declared more than once")]
    DuplicateTrigger(String),

    /// Transition or closing trigger references an undeclared trigger
    #[error("trigger '{0}' is not declared")]
    UnknownTrigger(String),

    /// Regex pattern failed to compile
    #[error("trigger '{trigger}' has an invalid pattern: {reason}")]
    InvalidPattern {
        /// Trigger name
        trigger: String,
        /// Compiler message
        reason: String,
    },

    /// Transition row starts from a terminal role
    #[error("transition for trigger '{trigger}' starts from terminal role '{from}'")]
    TerminalSource {
        /// Source role
        from: String,
        /// Trigger name
        trigger: String,
    },

    /// Same (role, trigger) row declared twice
    #[error("transition from '{from}' on '{trigger}' declared more than once")]
    DuplicateTransition {
        /// Source role
        from: String,
        /// Trigger name
        trigger: String,
    },

    /// No trigger configured for closing a conversation this way
    #[error("no {0} trigger configured")]
    MissingClosingTrigger(String),

    /// Configuration text could not be parsed
    #[error("failed to parse flow configuration: {0}")]
    Parse(String),
}

/// One trigger declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Unique trigger name (also the classifier label)
    pub name: String,
    /// Higher wins when several triggers match
    #[serde(default)]
    pub priority: i32,
    /// Case-insensitive phrases matched on word boundaries
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Regular expressions matched against lead messages
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Qualification fields that must all hold the given values
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Default destination from any non-terminal role
    #[serde(default)]
    pub target: Option<String>,
    /// Free text shown to the classifier model
    #[serde(default)]
    pub description: String,
}

/// One explicit (role, trigger) -> role row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Source role, or `*` for any non-terminal role
    pub from: String,
    /// Trigger name
    pub trigger: String,
    /// Destination role
    pub to: String,
}

/// Profile override for one role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleProfileConfig {
    /// Role identifier
    pub role: String,
    /// Display name
    pub display_name: String,
    /// Prompt template key
    pub prompt_key: String,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// Flow configuration as written in TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Role assigned when no inbound classification is supplied
    #[serde(default = "default_initial_role")]
    pub initial_role: String,
    /// Trigger used by `close(won = true)`
    #[serde(default)]
    pub won_trigger: Option<String>,
    /// Trigger used by `close(won = false)`
    #[serde(default)]
    pub lost_trigger: Option<String>,
    /// Trigger declarations, in priority tie-break order
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    /// Explicit transition rows
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
    /// Role profile overrides
    #[serde(default)]
    pub roles: Vec<RoleProfileConfig>,
}

fn default_initial_role() -> String {
    "inbound-qualifier".to_string()
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            initial_role: default_initial_role(),
            won_trigger: None,
            lost_trigger: None,
            triggers: Vec::new(),
            transitions: Vec::new(),
            roles: Vec::new(),
        }
    }
}

impl FlowConfig {
    /// Parse a standalone flow TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

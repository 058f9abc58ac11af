use crate::error::{Error, Result};
use crate::role::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One scripted event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Inbound lead message
    Lead {
        /// Message text
        text: String,
        /// Qualification fields extracted from the message
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
    /// Reply from the active agent
    Agent {
        /// Message text
        text: String,
    },
    /// Close the conversation through the won or lost trigger
    Close {
        /// Won or lost
        won: bool,
    },
}

/// A canned conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScript {
    /// Conversation id used for the run
    pub conversation_id: String,
    /// External lead id
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Inbound classification applied to the first lead message
    #[serde(default)]
    pub initial_role: Option<AgentRole>,
    /// Steps in order
    pub steps: Vec<ScriptStep>,
}

impl LeadScript {
    /// Parse a JSON script
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Script(e.to_string()))
    }

    /// Parse a TOML script
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Script(e.to_string()))
    }

    /// Load a script file; `.json` is read as JSON, anything else as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Script(format!("{}: {}", path.display(), e)))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

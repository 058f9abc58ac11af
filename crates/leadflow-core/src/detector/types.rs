//! Detector input and output

use crate::conversation::ConversationState;
use crate::error::HandoffError;
use crate::role::AgentRole;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What the detector looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionContext {
    /// Conversation id
    pub conversation_id: String,
    /// Role owning the conversation
    pub current_role: AgentRole,
    /// Recent lead messages, oldest first
    pub messages: Vec<String>,
    /// Structured qualification fields
    pub fields: BTreeMap<String, String>,
    /// Field keys whose value changed with the latest message
    pub changed_fields: BTreeSet<String>,
}

impl DetectionContext {
    /// Empty context for a conversation
    #[must_use]
    pub fn new(conversation_id: impl Into<String>, current_role: AgentRole) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            current_role,
            messages: Vec::new(),
            fields: BTreeMap::new(),
            changed_fields: BTreeSet::new(),
        }
    }

    /// Build from a stored conversation, keeping the last `window` lead messages
    #[must_use]
    pub fn from_state(state: &ConversationState, window: usize) -> Self {
        Self {
            conversation_id: state.id.clone(),
            current_role: state.current_role,
            messages: state
                .recent_lead_messages(window)
                .into_iter()
                .map(str::to_string)
                .collect(),
            fields: state.fields.clone(),
            changed_fields: BTreeSet::new(),
        }
    }

    /// Add a lead message
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        self.messages.push(text.into());
        self
    }

    /// Set a qualification field as arriving with the latest message
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.changed_fields.insert(key.clone());
        self.fields.insert(key, value.into());
        self
    }

    /// Mark stored fields as changed by the latest message
    #[must_use]
    pub fn with_changed_fields(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.changed_fields.extend(keys);
        self
    }
}

/// Which rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Keyword phrase
    Keyword,
    /// Regex pattern
    Pattern,
    /// Qualification fields
    Fields,
    /// Delegated classifier
    Classifier,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keyword => "keyword",
            Self::Pattern => "pattern",
            Self::Fields => "fields",
            Self::Classifier => "classifier",
        })
    }
}

/// One matched trigger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerMatch {
    /// Trigger name
    pub trigger: String,
    /// Trigger priority
    pub priority: i32,
    /// Declaration position of the trigger
    pub declared_at: usize,
    /// 0.0 to 1.0
    pub confidence: f32,
    /// Rule that matched
    pub source: MatchSource,
}

/// Detector output
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Matches ordered by priority descending, then declaration order
    pub matches: Vec<TriggerMatch>,
    /// Set when the classifier could not contribute
    pub classifier_error: Option<HandoffError>,
}

impl Detection {
    /// Highest-precedence match
    #[must_use]
    pub fn best(&self) -> Option<&TriggerMatch> {
        self.matches.first()
    }

    /// Whether nothing matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Matched trigger names in precedence order
    #[must_use]
    pub fn trigger_names(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.trigger.as_str()).collect()
    }
}

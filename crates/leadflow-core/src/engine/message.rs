use crate::conversation::TransitionRecord;
use crate::detector::TriggerMatch;
use crate::error::HandoffError;
use crate::role::AgentRole;
use crate::router::SuppressionReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One inbound lead message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation the message belongs to
    pub conversation_id: String,
    /// External lead id, stored on first sight
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Message text
    pub text: String,
    /// Qualification fields extracted upstream
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Role chosen by inbound classification; only used for new conversations
    #[serde(default)]
    pub initial_role: Option<AgentRole>,
}

impl InboundMessage {
    /// Message for a conversation
    #[must_use]
    pub fn new(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            lead_id: None,
            text: text.into(),
            fields: BTreeMap::new(),
            initial_role: None,
        }
    }

    /// Attach the lead id
    #[must_use]
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    /// Attach a qualification field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the inbound classification
    #[must_use]
    pub fn with_initial_role(mut self, role: AgentRole) -> Self {
        self.initial_role = Some(role);
        self
    }
}

/// What happened for one inbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Conversation id
    pub conversation_id: String,
    /// Role that answers the lead next
    pub active_role: AgentRole,
    /// Whether this message created the conversation
    pub created: bool,
    /// Detected triggers, best first
    pub matches: Vec<TriggerMatch>,
    /// Committed handoff
    pub transition: Option<TransitionRecord>,
    /// Set when the best trigger was ignored on purpose
    pub suppressed: Option<SuppressionReason>,
    /// Set when classification or routing failed and the current agent continues
    #[serde(serialize_with = "serialize_error")]
    pub degraded: Option<HandoffError>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<HandoffError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

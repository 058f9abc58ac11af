//! Conversation state and transition records
//!
//! A [`ConversationState`] is created on the first inbound message of a lead
//! and is only ever mutated through the router or the engine. It is never
//! deleted; entering a terminal role soft-closes it.

use crate::role::AgentRole;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Current time truncated to microseconds.
///
/// Stores persist `updated_at` with microsecond precision, so the in-memory
/// value must not carry extra nanoseconds or compare-and-set would never match.
#[must_use]
pub fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Next version stamp, strictly greater than `previous`
#[must_use]
pub fn next_version(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Open or soft-closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Conversation is live
    Open,
    /// Conversation reached a terminal role
    Closed,
}

/// Who wrote a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The lead
    Lead,
    /// The agent currently owning the conversation
    Agent,
}

/// One line of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Author
    pub speaker: Speaker,
    /// Role that owned the conversation when the message was recorded
    pub role: AgentRole,
    /// Message text
    pub text: String,
    /// When the message was recorded
    pub at: DateTime<Utc>,
}

/// One lead's ongoing interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Unique conversation id
    pub id: String,
    /// External lead identifier (CRM id, handle)
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Role that currently owns the conversation
    pub current_role: AgentRole,
    /// Prior roles, oldest first
    #[serde(default)]
    pub history: Vec<AgentRole>,
    /// Open or soft-closed
    pub status: ConversationStatus,
    /// Collected qualification data
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Conversation transcript
    #[serde(default)]
    pub transcript: Vec<TranscriptMessage>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last write; doubles as the compare-and-set version
    pub updated_at: DateTime<Utc>,
    /// When the conversation was soft-closed
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl ConversationState {
    /// Create a conversation owned by `initial_role`
    #[must_use]
    pub fn new(id: impl Into<String>, initial_role: AgentRole) -> Self {
        let now = now_micros();
        let mut state = Self {
            id: id.into(),
            lead_id: None,
            current_role: initial_role,
            history: Vec::new(),
            status: ConversationStatus::Open,
            fields: BTreeMap::new(),
            transcript: Vec::new(),
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        if initial_role.is_terminal() {
            state.close(now);
        }
        state
    }

    /// Attach the external lead id
    #[must_use]
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    /// Whether the conversation was soft-closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == ConversationStatus::Closed
    }

    /// Append a transcript message and bump the version
    pub fn push_message(&mut self, speaker: Speaker, text: impl Into<String>) {
        let at = next_version(self.updated_at);
        self.transcript.push(TranscriptMessage {
            speaker,
            role: self.current_role,
            text: text.into(),
            at,
        });
        self.updated_at = at;
    }

    /// Merge qualification fields (later values win).
    ///
    /// Returns the keys whose value actually changed; the version is bumped
    /// only when that set is non-empty.
    pub fn merge_fields(&mut self, fields: &BTreeMap<String, String>) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();
        for (key, value) in fields {
            if self.fields.get(key) != Some(value) {
                self.fields.insert(key.clone(), value.clone());
                changed.insert(key.clone());
            }
        }
        if !changed.is_empty() {
            self.updated_at = next_version(self.updated_at);
        }
        changed
    }

    /// The last `window` lead messages, oldest first
    #[must_use]
    pub fn recent_lead_messages(&self, window: usize) -> Vec<&str> {
        let mut texts: Vec<&str> = self
            .transcript
            .iter()
            .rev()
            .filter(|m| m.speaker == Speaker::Lead)
            .take(window)
            .map(|m| m.text.as_str())
            .collect();
        texts.reverse();
        texts
    }

    /// Produce the state after handing off to `to`, plus its record.
    ///
    /// `self` is left untouched; the caller persists both or neither.
    #[must_use]
    pub fn handed_off(&self, to: AgentRole, trigger: &str) -> (ConversationState, TransitionRecord) {
        let mut next = self.clone();
        let at = next_version(self.updated_at);
        next.history.push(self.current_role);
        next.current_role = to;
        next.updated_at = at;
        if to.is_terminal() {
            next.close(at);
        }

        let record = TransitionRecord {
            id: Uuid::new_v4(),
            conversation_id: self.id.clone(),
            from: self.current_role,
            to,
            trigger: trigger.to_string(),
            occurred_at: at,
        };
        (next, record)
    }

    fn close(&mut self, at: DateTime<Utc>) {
        self.status = ConversationStatus::Closed;
        self.closed_at = Some(at);
    }
}

/// Immutable, append-only log entry for one role change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Record id
    pub id: Uuid,
    /// Conversation the transition belongs to
    pub conversation_id: String,
    /// Role before the handoff
    pub from: AgentRole,
    /// Role after the handoff
    pub to: AgentRole,
    /// Name of the trigger that caused it
    pub trigger: String,
    /// When the transition was committed
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests;

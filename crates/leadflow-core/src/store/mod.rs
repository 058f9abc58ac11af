//! Conversation persistence
//!
//! The core only talks to storage through [`ConversationStore`]:
//! - read a conversation
//! - create it once
//! - compare-and-set write keyed on `updated_at`
//! - commit a state change together with its transition record
//!
//! Backends:
//! - `MemoryStore`: tests, simulations, single-process development
//! - `SqliteStore`: persistent, one transaction per commit

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::conversation::{ConversationState, TransitionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Conversation does not exist
    #[error("conversation not found: {0}")]
    NotFound(String),

    /// Conversation already exists
    #[error("conversation already exists: {0}")]
    AlreadyExists(String),

    /// Stored version differs from the expected one
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    Conflict {
        /// Conversation id
        id: String,
        /// Version the writer read
        expected: DateTime<Utc>,
        /// Version currently stored
        actual: DateTime<Utc>,
    },

    /// Backend failure (I/O, connection, SQL)
    #[error("backend error: {0}")]
    Backend(String),

    /// Stored data could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Conflicts and backend hiccups are worth another attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::Backend(_))
    }
}

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence collaborator
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation
    async fn get_conversation_state(&self, id: &str) -> StoreResult<Option<ConversationState>>;

    /// Insert a new conversation; fails with `AlreadyExists` if the id is taken
    async fn create_conversation_state(&self, state: &ConversationState) -> StoreResult<()>;

    /// Replace a conversation if its stored `updated_at` equals `expected_updated_at`
    async fn write_conversation_state(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Compare-and-set the state and append `record`, atomically
    async fn commit_transition(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
        record: &TransitionRecord,
    ) -> StoreResult<()>;

    /// Transition records of a conversation, oldest first
    async fn transition_records(&self, id: &str) -> StoreResult<Vec<TransitionRecord>>;

    /// Ids of all stored conversations
    async fn list_conversations(&self) -> StoreResult<Vec<String>>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn ConversationStore>;

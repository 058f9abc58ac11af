//! In-memory conversation store

use super::{ConversationStore, StoreError, StoreResult};
use crate::conversation::{ConversationState, TransitionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, ConversationState>,
    transitions: HashMap<String, Vec<TransitionRecord>>,
}

impl Inner {
    fn check_version(&self, id: &str, expected: DateTime<Utc>) -> StoreResult<()> {
        let stored = self
            .conversations
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if stored.updated_at != expected {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected,
                actual: stored.updated_at,
            });
        }
        Ok(())
    }
}

/// In-memory store; data is lost on restart
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_conversation_state(&self, id: &str) -> StoreResult<Option<ConversationState>> {
        Ok(self.inner.read().await.conversations.get(id).cloned())
    }

    async fn create_conversation_state(&self, state: &ConversationState) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.conversations.contains_key(&state.id) {
            return Err(StoreError::AlreadyExists(state.id.clone()));
        }
        inner.conversations.insert(state.id.clone(), state.clone());
        debug!(conversation_id = %state.id, "Conversation created in memory");
        Ok(())
    }

    async fn write_conversation_state(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_version(&state.id, expected_updated_at)?;
        inner.conversations.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
        record: &TransitionRecord,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_version(&state.id, expected_updated_at)?;
        inner.conversations.insert(state.id.clone(), state.clone());
        inner
            .transitions
            .entry(state.id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn transition_records(&self, id: &str) -> StoreResult<Vec<TransitionRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .transitions
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_conversations(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self.inner.read().await.conversations.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::AgentRole;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let state = ConversationState::new("conv-1", AgentRole::InboundQualifier);
        store.create_conversation_state(&state).await.unwrap();

        let loaded = store.get_conversation_state("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(store.get_conversation_state("missing").await.unwrap().is_none());

        let err = store.create_conversation_state(&state).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("conv-1".to_string()));
    }

    #[tokio::test]
    async fn test_compare_and_set() {
        let store = MemoryStore::new();
        let state = ConversationState::new("conv-1", AgentRole::InboundQualifier);
        store.create_conversation_state(&state).await.unwrap();

        let (next, record) = state.handed_off(AgentRole::Nurture, "not ready");
        store
            .commit_transition(&next, state.updated_at, &record)
            .await
            .unwrap();

        // stale writer loses
        let (stale, stale_record) = state.handed_off(AgentRole::Closer, "qualified");
        let err = store
            .commit_transition(&stale, state.updated_at, &stale_record)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(err.is_retryable());

        let records = store.transition_records("conv-1").await.unwrap();
        assert_eq!(records, vec![record]);
        let loaded = store.get_conversation_state("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded.current_role, AgentRole::Nurture);
    }

    #[tokio::test]
    async fn test_write_missing_conversation() {
        let store = MemoryStore::new();
        let state = ConversationState::new("ghost", AgentRole::Nurture);
        let err = store
            .write_conversation_state(&state, state.updated_at)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("ghost".to_string()));
        assert!(!err.is_retryable());
    }
}

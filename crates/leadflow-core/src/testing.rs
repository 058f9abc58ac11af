//! Shared fixtures for unit tests

use crate::conversation::{ConversationState, Speaker, TransitionRecord};
use crate::flow::FlowTable;
use crate::store::{ConversationStore, MemoryStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub(crate) const SAMPLE_FLOW: &str = include_str!("../tests/fixtures/flow.toml");

pub(crate) fn sample_table() -> Arc<FlowTable> {
    Arc::new(FlowTable::from_toml_str(SAMPLE_FLOW).expect("sample flow is valid"))
}

/// How [`FlakyStore`] sabotages commits
#[derive(Clone, Copy)]
pub(crate) enum Sabotage {
    /// Report a conflict without touching the data
    Conflict,
    /// Let another writer append a message first, so the version really moves
    ConcurrentWrite,
    /// Fail with a retryable backend error
    Backend,
    /// Fail with a non-retryable error
    Corrupt,
}

/// Memory store whose first `failures` transition commits are sabotaged.
///
/// Plain reads and writes always pass through.
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicU32,
    commits: AtomicU32,
    sabotage: Sabotage,
}

impl FlakyStore {
    pub(crate) fn new(failures: u32, sabotage: Sabotage) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(failures),
            commits: AtomicU32::new(0),
            sabotage,
        }
    }

    /// Commit attempts seen so far, sabotaged or not
    pub(crate) fn commits(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn get_conversation_state(&self, id: &str) -> StoreResult<Option<ConversationState>> {
        self.inner.get_conversation_state(id).await
    }

    async fn create_conversation_state(&self, state: &ConversationState) -> StoreResult<()> {
        self.inner.create_conversation_state(state).await
    }

    async fn write_conversation_state(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.write_conversation_state(state, expected_updated_at).await
    }

    async fn commit_transition(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
        record: &TransitionRecord,
    ) -> StoreResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let sabotaged = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if sabotaged {
            match self.sabotage {
                Sabotage::Conflict => {
                    return Err(StoreError::Conflict {
                        id: state.id.clone(),
                        expected: expected_updated_at,
                        actual: expected_updated_at,
                    })
                }
                Sabotage::ConcurrentWrite => {
                    let mut other = self
                        .inner
                        .get_conversation_state(&state.id)
                        .await?
                        .ok_or_else(|| StoreError::NotFound(state.id.clone()))?;
                    let version = other.updated_at;
                    other.push_message(Speaker::Agent, "reply from another worker");
                    self.inner.write_conversation_state(&other, version).await?;
                }
                Sabotage::Backend => {
                    return Err(StoreError::Backend("disk I/O error".to_string()));
                }
                Sabotage::Corrupt => {
                    return Err(StoreError::Serialization("bad row".to_string()));
                }
            }
        }
        self.inner
            .commit_transition(state, expected_updated_at, record)
            .await
    }

    async fn transition_records(&self, id: &str) -> StoreResult<Vec<TransitionRecord>> {
        self.inner.transition_records(id).await
    }

    async fn list_conversations(&self) -> StoreResult<Vec<String>> {
        self.inner.list_conversations().await
    }
}

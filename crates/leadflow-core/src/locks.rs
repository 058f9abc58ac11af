//! Per-conversation single-writer locks
//!
//! Everything that mutates a conversation (ingest, routing, agent replies)
//! runs while holding that conversation's [`ConversationGuard`]. Tokio mutexes
//! queue waiters in FIFO order, so messages for one conversation are handled
//! in arrival order. Different conversations never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Proof that the holder is the only writer of a conversation.
///
/// Dropping the last guard of a conversation with no queued waiters removes
/// its entry from the lock table.
#[derive(Debug)]
pub struct ConversationGuard {
    conversation_id: String,
    locks: Arc<LockMap>,
    _guard: OwnedMutexGuard<()>,
}

impl ConversationGuard {
    /// Conversation this guard protects
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        // the table and this guard hold the only references; a waiter adds one
        let removed = self
            .locks
            .remove_if(&self.conversation_id, |_, lock| Arc::strong_count(lock) <= 2)
            .is_some();
        if removed {
            trace!(conversation_id = %self.conversation_id, "Conversation lock released");
        }
    }
}

/// Lock table keyed by conversation id
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: Arc<LockMap>,
}

impl ConversationLocks {
    /// Empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `conversation_id`
    pub async fn acquire(&self, conversation_id: &str) -> ConversationGuard {
        // clone the Arc out so the map shard is not held across the await
        let lock = self
            .locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        trace!(conversation_id, "Conversation lock acquired");
        ConversationGuard {
            conversation_id: conversation_id.to_string(),
            locks: self.locks.clone(),
            _guard: guard,
        }
    }

    /// Number of tracked conversations
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no conversation is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests;

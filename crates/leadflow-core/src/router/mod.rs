//! Flow router
//!
//! Applies one trigger to one conversation. The decision itself is the pure
//! [`FlowTable::plan`]; this module adds locking, the compare-and-set commit
//! with bounded retries, logging and notifications.
//!
//! Every commit attempt starts from a fresh read of the stored state, so a
//! retry after a conflict re-plans against whatever the other writer left.

mod outcome;

pub use outcome::{SuppressionReason, TransitionOutcome, UnchangedReason};

use crate::conversation::TransitionRecord;
use crate::error::HandoffError;
use crate::event_bus::{EventBus, FlowEvent, Notifier, SharedNotifier};
use crate::flow::{FlowTable, RoutePlan};
use crate::locks::{ConversationGuard, ConversationLocks};
use crate::store::{SharedStore, StoreError};
use crate::utils::{retry_with_backoff, RetryConfig, RetryError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Router settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Commit retry policy
    pub retry: RetryConfig,
}

/// Applies triggers to conversations
pub struct FlowRouter {
    table: Arc<FlowTable>,
    store: SharedStore,
    bus: EventBus,
    notifiers: Vec<SharedNotifier>,
    retry: RetryConfig,
    locks: Arc<ConversationLocks>,
}

impl FlowRouter {
    /// Router over `table` persisting to `store`
    #[must_use]
    pub fn new(table: Arc<FlowTable>, store: SharedStore) -> Self {
        Self {
            table,
            store,
            bus: EventBus::default(),
            notifiers: Vec::new(),
            retry: RetryConfig::default(),
            locks: Arc::new(ConversationLocks::new()),
        }
    }

    /// Publish events on `bus`
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Also notify `notifier` of every committed transition
    #[must_use]
    pub fn with_notifier(mut self, notifier: SharedNotifier) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Replace the commit retry policy
    #[must_use]
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.retry = config.retry;
        self
    }

    /// Share a lock table with other writers of the same store
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ConversationLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Flow table
    #[must_use]
    pub fn table(&self) -> &Arc<FlowTable> {
        &self.table
    }

    /// Store
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Event bus
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Lock table
    #[must_use]
    pub fn locks(&self) -> &Arc<ConversationLocks> {
        &self.locks
    }

    /// Commit retry policy
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Apply `trigger` to a conversation, taking its lock first
    pub async fn apply(
        &self,
        conversation_id: &str,
        trigger: &str,
    ) -> Result<TransitionOutcome, HandoffError> {
        let guard = self.locks.acquire(conversation_id).await;
        self.apply_locked(&guard, trigger).await
    }

    /// Apply `trigger` while the caller holds the conversation lock
    #[instrument(skip(self, guard), fields(conversation_id = %guard.conversation_id()))]
    pub async fn apply_locked(
        &self,
        guard: &ConversationGuard,
        trigger: &str,
    ) -> Result<TransitionOutcome, HandoffError> {
        let conversation_id = guard.conversation_id();
        let result = retry_with_backoff(
            &self.retry,
            || self.attempt(conversation_id, trigger),
            |e: &HandoffError| matches!(e, HandoffError::Store(s) if s.is_retryable()),
        )
        .await;

        match result {
            Ok(outcome) => {
                self.report(&outcome, trigger);
                Ok(outcome)
            }
            Err(RetryError {
                last_error: HandoffError::Store(e),
                attempts,
            }) if e.is_retryable() => {
                warn!(
                    conversation_id,
                    trigger,
                    attempts,
                    error = %e,
                    "Transition abandoned, stored state unchanged"
                );
                self.bus.publish(FlowEvent::TransitionFailed {
                    conversation_id: conversation_id.to_string(),
                    trigger: trigger.to_string(),
                    attempts,
                });
                match e {
                    StoreError::Conflict { .. } => Err(HandoffError::PersistenceConflict {
                        conversation_id: conversation_id.to_string(),
                        attempts,
                    }),
                    other => Err(HandoffError::Store(other)),
                }
            }
            Err(RetryError { last_error, .. }) => Err(last_error),
        }
    }

    /// One read-plan-commit cycle
    async fn attempt(
        &self,
        conversation_id: &str,
        trigger: &str,
    ) -> Result<TransitionOutcome, HandoffError> {
        let state = self
            .store
            .get_conversation_state(conversation_id)
            .await?
            .ok_or_else(|| HandoffError::ConversationNotFound(conversation_id.to_string()))?;

        let outcome = match self.table.plan(state.current_role, trigger) {
            RoutePlan::Terminal => TransitionOutcome::Suppressed {
                state,
                reason: SuppressionReason::TerminalStateViolation,
            },
            RoutePlan::Invalid => TransitionOutcome::Suppressed {
                state,
                reason: SuppressionReason::InvalidTransition,
            },
            RoutePlan::SelfTransition => TransitionOutcome::Unchanged {
                state,
                reason: UnchangedReason::SelfTransition,
            },
            RoutePlan::Transition { to } => {
                let name = self
                    .table
                    .trigger(trigger)
                    .map_or(trigger, |t| t.name.as_str());
                let (next, record) = state.handed_off(to, name);
                self.store
                    .commit_transition(&next, state.updated_at, &record)
                    .await?;
                TransitionOutcome::Applied { state: next, record }
            }
        };
        Ok(outcome)
    }

    fn report(&self, outcome: &TransitionOutcome, trigger: &str) {
        match outcome {
            TransitionOutcome::Applied { record, .. } => {
                info!(
                    conversation_id = %record.conversation_id,
                    from = %record.from,
                    to = %record.to,
                    trigger = %record.trigger,
                    "Handoff applied"
                );
                self.notify(record);
            }
            TransitionOutcome::Unchanged { state, .. } => {
                debug!(
                    conversation_id = %state.id,
                    role = %state.current_role,
                    trigger,
                    "Trigger targets the current role, nothing to do"
                );
            }
            TransitionOutcome::Suppressed { state, reason } => {
                let error = reason.to_error(state, trigger);
                match reason {
                    SuppressionReason::TerminalStateViolation => {
                        info!(conversation_id = %state.id, error = %error, "Trigger suppressed");
                        self.bus.publish(FlowEvent::TransitionSuppressed {
                            conversation_id: state.id.clone(),
                            role: state.current_role,
                            trigger: trigger.to_string(),
                        });
                    }
                    SuppressionReason::InvalidTransition => {
                        warn!(
                            conversation_id = %state.id,
                            error = %error,
                            "Flow table has no entry for this trigger"
                        );
                        self.bus.publish(FlowEvent::InvalidTransition {
                            conversation_id: state.id.clone(),
                            role: state.current_role,
                            trigger: trigger.to_string(),
                        });
                    }
                }
            }
        }
    }

    fn notify(&self, record: &TransitionRecord) {
        self.bus.notify(record);
        for notifier in &self.notifiers {
            debug!(notifier = notifier.name(), "Notifying transition");
            notifier.notify(record);
        }
    }
}

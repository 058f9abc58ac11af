//! Flow engine
//!
//! The pipeline run for every inbound lead message:
//!
//! 1. take the conversation lock
//! 2. load the conversation, or create it owned by the inbound
//!    classification (falling back to the table's initial role)
//! 3. append the message and merge fields (compare-and-set, retried)
//! 4. detect triggers
//! 5. route the best match that has a table entry from the current role
//!
//! Steps 4 and 5 never fail the turn: classifier and routing problems are
//! logged and reported in [`TurnOutcome::degraded`] while the current agent
//! keeps the conversation.

mod message;

pub use message::{InboundMessage, TurnOutcome};

use crate::conversation::{ConversationState, Speaker, TransitionRecord};
use crate::detector::{Detection, TriggerDetector, TriggerMatch};
use crate::error::{Error, HandoffError, Result};
use crate::flow::{ConfigError, FlowTable, RoutePlan};
use crate::router::{FlowRouter, TransitionOutcome};
use crate::store::{SharedStore, StoreError, StoreResult};
use crate::utils::{retry_with_backoff, RetryError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Slack on top of the classifier timeout for the whole detection step
const DETECTION_GRACE: Duration = Duration::from_millis(500);

/// Runs inbound messages through detection and routing
pub struct FlowEngine {
    detector: Arc<TriggerDetector>,
    router: FlowRouter,
}

impl FlowEngine {
    /// Engine over a detector and a router sharing the same flow table
    #[must_use]
    pub fn new(detector: Arc<TriggerDetector>, router: FlowRouter) -> Self {
        Self { detector, router }
    }

    /// Router
    #[must_use]
    pub fn router(&self) -> &FlowRouter {
        &self.router
    }

    /// Detector
    #[must_use]
    pub fn detector(&self) -> &TriggerDetector {
        &self.detector
    }

    /// Flow table
    #[must_use]
    pub fn table(&self) -> &Arc<FlowTable> {
        self.router.table()
    }

    /// Store
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        self.router.store()
    }

    /// Process one inbound lead message
    #[instrument(skip(self, message), fields(conversation_id = %message.conversation_id))]
    pub async fn handle_message(&self, message: InboundMessage) -> Result<TurnOutcome> {
        let guard = self.router.locks().acquire(&message.conversation_id).await;

        let (state, created, changed_fields) = self
            .with_retry(&message.conversation_id, || self.ingest(&message))
            .await?;
        if created {
            info!(role = %state.current_role, "Conversation opened");
        }

        let detection = self.detect(&state, changed_fields).await;
        let mut outcome = TurnOutcome {
            conversation_id: state.id.clone(),
            active_role: state.current_role,
            created,
            matches: detection.matches.clone(),
            transition: None,
            suppressed: None,
            degraded: detection.classifier_error.clone(),
        };

        let Some(best) = self.select(&state, &detection) else {
            debug!("No trigger matched");
            return Ok(outcome);
        };

        match self.router.apply_locked(&guard, &best.trigger).await {
            Ok(TransitionOutcome::Applied { state, record }) => {
                outcome.active_role = state.current_role;
                outcome.transition = Some(record);
            }
            Ok(TransitionOutcome::Suppressed { state, reason }) => {
                outcome.active_role = state.current_role;
                outcome.suppressed = Some(reason);
            }
            Ok(TransitionOutcome::Unchanged { state, .. }) => {
                outcome.active_role = state.current_role;
            }
            Err(e) => {
                warn!(
                    trigger = %best.trigger,
                    error = %e,
                    "Routing failed, current agent continues"
                );
                outcome.degraded = Some(e);
            }
        }
        Ok(outcome)
    }

    /// Append an agent message to the transcript
    pub async fn record_agent_reply(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<ConversationState> {
        let _guard = self.router.locks().acquire(conversation_id).await;
        self.with_retry(conversation_id, || async move {
            let mut state = self
                .store()
                .get_conversation_state(conversation_id)
                .await?
                .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))?;
            let expected = state.updated_at;
            state.push_message(Speaker::Agent, text);
            self.store().write_conversation_state(&state, expected).await?;
            Ok::<_, StoreError>(state)
        })
        .await
    }

    /// Close a conversation through the configured won or lost trigger
    pub async fn close(&self, conversation_id: &str, won: bool) -> Result<TransitionOutcome> {
        let trigger = self.table().closing_trigger(won).ok_or_else(|| {
            ConfigError::MissingClosingTrigger(if won { "won" } else { "lost" }.to_string())
        })?;
        Ok(self.router.apply(conversation_id, trigger).await?)
    }

    /// Stored state and transition records of a conversation
    pub async fn history(
        &self,
        conversation_id: &str,
    ) -> Result<(ConversationState, Vec<TransitionRecord>)> {
        let state = self
            .store()
            .get_conversation_state(conversation_id)
            .await?
            .ok_or_else(|| HandoffError::ConversationNotFound(conversation_id.to_string()))?;
        let records = self.store().transition_records(conversation_id).await?;
        Ok((state, records))
    }

    /// Load-or-create, append the lead message and merge fields
    ///
    /// Also returns the field keys this message changed.
    async fn ingest(
        &self,
        message: &InboundMessage,
    ) -> StoreResult<(ConversationState, bool, BTreeSet<String>)> {
        let store = self.store();
        match store.get_conversation_state(&message.conversation_id).await? {
            Some(mut state) => {
                let expected = state.updated_at;
                if state.lead_id.is_none() {
                    state.lead_id = message.lead_id.clone();
                }
                let changed = state.merge_fields(&message.fields);
                state.push_message(Speaker::Lead, message.text.as_str());
                store.write_conversation_state(&state, expected).await?;
                Ok((state, false, changed))
            }
            None => {
                let mut state =
                    ConversationState::new(message.conversation_id.as_str(), self.initial_role(message));
                state.lead_id = message.lead_id.clone();
                let changed = state.merge_fields(&message.fields);
                state.push_message(Speaker::Lead, message.text.as_str());
                store.create_conversation_state(&state).await?;
                Ok((state, true, changed))
            }
        }
    }

    /// Highest-precedence match the table can route from the current role.
    ///
    /// Falls back to the overall best match so that an unroutable trigger is
    /// still reported as an invalid transition.
    fn select<'a>(
        &self,
        state: &ConversationState,
        detection: &'a Detection,
    ) -> Option<&'a TriggerMatch> {
        detection
            .matches
            .iter()
            .find(|m| self.table().plan(state.current_role, &m.trigger) != RoutePlan::Invalid)
            .or_else(|| detection.best())
    }

    fn initial_role(&self, message: &InboundMessage) -> crate::role::AgentRole {
        match message.initial_role {
            Some(role) if role.is_terminal() => {
                warn!(%role, "Ignoring terminal inbound classification");
                self.table().initial_role()
            }
            Some(role) => role,
            None => self.table().initial_role(),
        }
    }

    async fn detect(&self, state: &ConversationState, changed_fields: BTreeSet<String>) -> Detection {
        let ctx = self.detector.context_for(state).with_changed_fields(changed_fields);
        let limit =
            Duration::from_millis(self.detector.config().classifier_timeout_ms) + DETECTION_GRACE;
        match tokio::time::timeout(limit, self.detector.detect(&ctx)).await {
            Ok(detection) => detection,
            Err(_) => {
                warn!(conversation_id = %state.id, "Detection timed out");
                Detection {
                    matches: Vec::new(),
                    classifier_error: Some(HandoffError::ClassificationUnavailable {
                        classifier: "detector".to_string(),
                        reason: format!("timed out after {} ms", limit.as_millis()),
                    }),
                }
            }
        }
    }

    /// Retry a read-modify-write on conflicts, backend hiccups, and create races
    async fn with_retry<T, F, Fut>(&self, conversation_id: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        retry_with_backoff(self.router.retry_config(), operation, |e: &StoreError| {
            e.is_retryable() || matches!(e, StoreError::AlreadyExists(_))
        })
        .await
        .map_err(|RetryError { last_error, attempts }| match last_error {
            StoreError::Conflict { .. } | StoreError::AlreadyExists(_) => {
                Error::Handoff(HandoffError::PersistenceConflict {
                    conversation_id: conversation_id.to_string(),
                    attempts,
                })
            }
            StoreError::NotFound(id) => Error::Handoff(HandoffError::ConversationNotFound(id)),
            other => Error::Store(other),
        })
    }
}

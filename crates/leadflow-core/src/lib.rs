//! Leadflow Core - SDR handoff orchestration
//!
//! This crate decides which AI sales agent owns a lead conversation and
//! performs the handoff when the conversation calls for it:
//! - Flow: the declarative (role, trigger) -> role table, loaded once
//! - Detector: keyword, pattern, field and classifier based trigger detection
//! - Router: locked, compare-and-set transitions with bounded retries
//! - Engine: the per-message pipeline tying detection and routing together
//! - Store: conversation state and the append-only transition log
//! - Event bus: transition events and notifiers
//! - Simulation: replaying canned lead conversations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod conversation;
pub mod detector;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod flow;
pub mod locks;
pub mod role;
pub mod router;
pub mod simulation;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use conversation::{
    ConversationState, ConversationStatus, Speaker, TranscriptMessage, TransitionRecord,
};
pub use detector::{
    Classifier, ClassifierError, Detection, DetectionContext, DetectorConfig, LlmClassifier,
    MatchSource, SharedClassifier, TriggerDetector, TriggerMatch, Verdict,
};
pub use engine::{FlowEngine, InboundMessage, TurnOutcome};
pub use error::{format_error_for_cli, Error, HandoffError, Result, UserFriendlyError};
pub use event_bus::{EventBus, FlowEvent, Notifier, SharedNotifier, WebhookConfig, WebhookNotifier};
pub use flow::{ConfigError, FlowConfig, FlowTable, HandoffTrigger, RoutePlan};
pub use locks::{ConversationGuard, ConversationLocks};
pub use role::{AgentRole, RoleDirectory, RoleProfile};
pub use router::{
    FlowRouter, RouterConfig, SuppressionReason, TransitionOutcome, UnchangedReason,
};
pub use simulation::{LeadScript, ScriptStep, SimulationReport, Simulator, TurnReport};
pub use store::{ConversationStore, MemoryStore, SharedStore, SqliteStore, StoreError};
pub use utils::RetryConfig;

//! End-to-end handoff scenarios

mod common;

use async_trait::async_trait;
use common::{router, table};
use futures::future::join_all;
use leadflow_core::{
    AgentRole, Classifier, ClassifierError, ConversationState, ConversationStore,
    DetectionContext, DetectorConfig, FlowEngine, FlowEvent, HandoffError, InboundMessage,
    MemoryStore, SharedStore, SqliteStore, SuppressionReason, TransitionOutcome, TriggerDetector,
    Verdict,
};
use std::sync::Arc;

async fn seeded(store: &SharedStore, id: &str, role: AgentRole) {
    store
        .create_conversation_state(&ConversationState::new(id, role))
        .await
        .unwrap();
}

#[tokio::test]
async fn pricing_objection_moves_to_objection_handler() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    seeded(&store, "lead-1", AgentRole::InboundQualifier).await;

    let outcome = router(store.clone())
        .apply("lead-1", "pricing objection detected")
        .await
        .unwrap();

    let state = outcome.state();
    assert_eq!(state.current_role, AgentRole::ObjectionHandler);
    assert_eq!(state.history, vec![AgentRole::InboundQualifier]);
    assert_eq!(store.transition_records("lead-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn closed_won_ignores_ready_to_book() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    seeded(&store, "lead-1", AgentRole::ClosedWon).await;
    let router = router(store.clone());
    let mut events = router.event_bus().subscribe();

    let outcome = router.apply("lead-1", "ready to book").await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Suppressed {
            reason: SuppressionReason::TerminalStateViolation,
            ..
        }
    ));
    assert_eq!(outcome.state().current_role, AgentRole::ClosedWon);
    assert!(store.transition_records("lead-1").await.unwrap().is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        FlowEvent::TransitionSuppressed { .. }
    ));
}

struct NeverAnswers;

#[async_trait]
impl Classifier for NeverAnswers {
    fn name(&self) -> &str {
        "never"
    }

    async fn classify(&self, _ctx: &DetectionContext) -> Result<Option<Verdict>, ClassifierError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn classifier_timeout_keeps_keyword_matches() {
    let detector = TriggerDetector::new(table())
        .with_classifier(Arc::new(NeverAnswers))
        .with_config(DetectorConfig {
            scan_window: 1,
            classifier_timeout_ms: 250,
        });
    let ctx = DetectionContext::new("lead-1", AgentRole::Closer).with_message("not right now");

    let detection = detector.detect(&ctx).await;
    assert_eq!(detection.trigger_names(), vec!["not ready"]);
    assert!(matches!(
        detection.classifier_error,
        Some(HandoffError::ClassificationUnavailable { .. })
    ));
}

fn engine(store: SharedStore) -> Arc<FlowEngine> {
    Arc::new(FlowEngine::new(
        Arc::new(TriggerDetector::new(table())),
        router(store),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_serialize_per_conversation() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let engine = engine(store.clone());

    let turns = (0..30).map(|i| {
        let engine = engine.clone();
        async move {
            let id = format!("lead-{}", i % 3);
            // every message on every lead carries the same pricing objection
            engine
                .handle_message(InboundMessage::new(id, "that is too expensive"))
                .await
        }
    });
    for result in join_all(turns).await {
        result.unwrap();
    }

    for i in 0..3 {
        let id = format!("lead-{i}");
        let state = store.get_conversation_state(&id).await.unwrap().unwrap();
        assert_eq!(state.transcript.len(), 10);
        assert_eq!(state.current_role, AgentRole::ObjectionHandler);
        // one handoff, then self-transitions
        assert_eq!(store.transition_records(&id).await.unwrap().len(), 1);
    }
    assert!(engine.router().locks().is_empty());
}

#[tokio::test]
async fn sqlite_backed_conversation_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("leadflow.db");

    {
        let store: SharedStore = Arc::new(SqliteStore::new(&path).await.unwrap());
        let engine = engine(store);
        for text in ["hi there", "too expensive for us", "ok, that makes sense"] {
            engine
                .handle_message(InboundMessage::new("lead-1", text))
                .await
                .unwrap();
        }
    }

    let store: SharedStore = Arc::new(SqliteStore::new(&path).await.unwrap());
    let engine = engine(store);
    let (state, records) = engine.history("lead-1").await.unwrap();
    assert_eq!(state.current_role, AgentRole::Closer);
    assert_eq!(state.transcript.len(), 3);
    assert_eq!(
        records.iter().map(|r| (r.from, r.to)).collect::<Vec<_>>(),
        vec![
            (AgentRole::InboundQualifier, AgentRole::ObjectionHandler),
            (AgentRole::ObjectionHandler, AgentRole::Closer),
        ]
    );

    let turn = engine
        .handle_message(InboundMessage::new("lead-1", "Signed, thanks!"))
        .await
        .unwrap();
    assert_eq!(turn.active_role, AgentRole::ClosedWon);
    let (state, _) = engine.history("lead-1").await.unwrap();
    assert!(state.is_closed());
}

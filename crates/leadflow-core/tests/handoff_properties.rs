//! Property-based tests for routing and detection
//!
//! Random trigger sequences are replayed against the sample flow table on an
//! in-memory store; the transition log must always agree with the state.

mod common;

use common::{router, table, FLOW};
use leadflow_core::{
    AgentRole, ConversationState, ConversationStore, DetectionContext, FlowTable, MemoryStore,
    SharedStore, TriggerDetector,
};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

fn trigger_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("deal won"),
        Just("deal lost"),
        Just("ready to book"),
        Just("pricing objection detected"),
        Just("competitor mentioned"),
        Just("qualified"),
        Just("objection resolved"),
        Just("not ready"),
        Just("no such trigger"),
    ]
}

fn open_role() -> impl Strategy<Value = AgentRole> {
    prop_oneof![
        Just(AgentRole::InboundQualifier),
        Just(AgentRole::Nurture),
        Just(AgentRole::ObjectionHandler),
        Just(AgentRole::Closer),
        Just(AgentRole::Booking),
    ]
}

/// (phrase, trigger it fires)
fn phrase() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop_oneof![
        Just(("signed", "deal won")),
        Just(("not interested", "deal lost")),
        Just(("book a call", "ready to book")),
        Just(("too expensive", "pricing objection detected")),
        Just(("already using", "competitor mentioned")),
        Just(("makes sense", "objection resolved")),
        Just(("maybe later", "not ready")),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn replay(
    start: AgentRole,
    triggers: &[&str],
) -> (ConversationState, Vec<leadflow_core::TransitionRecord>, usize) {
    let store: SharedStore = Arc::new(MemoryStore::new());
    store
        .create_conversation_state(&ConversationState::new("lead", start))
        .await
        .unwrap();
    let router = router(store.clone());

    let mut applied = 0;
    for trigger in triggers {
        if router.apply("lead", trigger).await.unwrap().is_applied() {
            applied += 1;
        }
    }

    let state = store.get_conversation_state("lead").await.unwrap().unwrap();
    let records = store.transition_records("lead").await.unwrap();
    (state, records, applied)
}

// ============================================================================
// Routing properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_log_matches_history(
        start in open_role(),
        triggers in prop::collection::vec(trigger_name(), 0..12),
    ) {
        let (state, records, applied) = runtime().block_on(replay(start, &triggers));

        prop_assert_eq!(records.len(), state.history.len());
        prop_assert_eq!(records.len(), applied);

        // records chain from the start role to the current one
        let mut role = start;
        for (record, previous) in records.iter().zip(&state.history) {
            prop_assert_eq!(record.from, role);
            prop_assert_eq!(record.from, *previous);
            prop_assert_ne!(record.from, record.to);
            role = record.to;
        }
        prop_assert_eq!(role, state.current_role);
    }

    #[test]
    fn prop_terminal_roles_never_leave(
        start in open_role(),
        triggers in prop::collection::vec(trigger_name(), 0..12),
    ) {
        let (state, records, _) = runtime().block_on(replay(start, &triggers));

        for record in &records {
            prop_assert!(!record.from.is_terminal());
        }
        prop_assert_eq!(state.is_closed(), state.current_role.is_terminal());
        if let Some(position) = records.iter().position(|r| r.to.is_terminal()) {
            prop_assert_eq!(position, records.len() - 1);
        }
    }

    #[test]
    fn prop_same_trigger_twice_hands_off_at_most_once(
        start in open_role(),
        trigger in trigger_name(),
    ) {
        let (_, records, _) = runtime().block_on(replay(start, &[trigger, trigger]));
        prop_assert!(records.len() <= 1);
    }
}

// ============================================================================
// Detection properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_matches_follow_precedence(
        role in open_role(),
        phrases in prop::collection::vec(phrase(), 1..5),
    ) {
        let flow: Arc<FlowTable> = table();
        let detector = TriggerDetector::new(flow.clone());
        let text = phrases.iter().map(|(p, _)| *p).collect::<Vec<_>>().join(". ");
        let ctx = DetectionContext::new("lead", role).with_message(text);

        let detection = runtime().block_on(detector.detect(&ctx));

        let mut expected: Vec<&str> = phrases.iter().map(|(_, t)| *t).collect();
        expected.sort();
        expected.dedup();
        let mut found = detection.trigger_names();
        found.sort();
        prop_assert_eq!(found, expected);

        for pair in detection.matches.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.priority > b.priority
                    || (a.priority == b.priority && a.declared_at < b.declared_at)
            );
        }
        prop_assert!(detection.classifier_error.is_none());
    }

    #[test]
    fn prop_equal_priority_prefers_earlier_declaration(
        swap in any::<bool>(),
        priority in -50i32..50,
    ) {
        let (first, second) = if swap { ("beta", "alpha") } else { ("alpha", "beta") };
        let flow = format!(
            r#"
[[triggers]]
name = "{first}"
priority = {priority}
keywords = ["{first}"]
target = "closer"

[[triggers]]
name = "{second}"
priority = {priority}
keywords = ["{second}"]
target = "nurture"
"#
        );
        let flow = Arc::new(FlowTable::from_toml_str(&flow).unwrap());
        let detector = TriggerDetector::new(flow);
        let ctx = DetectionContext::new("lead", AgentRole::InboundQualifier)
            .with_message("beta then alpha");

        let detection = runtime().block_on(detector.detect(&ctx));
        prop_assert_eq!(detection.best().map(|m| m.trigger.as_str()), Some(first));
    }
}

#[test]
fn sample_flow_parses() {
    assert!(FlowTable::from_toml_str(FLOW).is_ok());
}

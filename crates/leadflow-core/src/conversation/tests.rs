use super::*;

#[test]
fn test_new_conversation_is_open() {
    let state = ConversationState::new("conv-1", AgentRole::InboundQualifier).with_lead_id("ig:123");
    assert_eq!(state.current_role, AgentRole::InboundQualifier);
    assert!(state.history.is_empty());
    assert!(!state.is_closed());
    assert_eq!(state.lead_id.as_deref(), Some("ig:123"));
    assert_eq!(state.created_at, state.updated_at);
}

#[test]
fn test_handed_off_appends_history_and_builds_record() {
    let state = ConversationState::new("conv-1", AgentRole::InboundQualifier);
    let (next, record) = state.handed_off(AgentRole::ObjectionHandler, "pricing objection detected");

    assert_eq!(next.current_role, AgentRole::ObjectionHandler);
    assert_eq!(next.history, vec![AgentRole::InboundQualifier]);
    assert!(next.updated_at > state.updated_at);

    assert_eq!(record.conversation_id, "conv-1");
    assert_eq!(record.from, AgentRole::InboundQualifier);
    assert_eq!(record.to, AgentRole::ObjectionHandler);
    assert_eq!(record.trigger, "pricing objection detected");
    assert_eq!(record.occurred_at, next.updated_at);

    // original untouched
    assert_eq!(state.current_role, AgentRole::InboundQualifier);
}

#[test]
fn test_handoff_to_terminal_soft_closes() {
    let state = ConversationState::new("conv-1", AgentRole::Closer);
    let (next, _) = state.handed_off(AgentRole::ClosedWon, "deal won");
    assert!(next.is_closed());
    assert_eq!(next.closed_at, Some(next.updated_at));
}

#[test]
fn test_versions_strictly_increase() {
    let mut state = ConversationState::new("conv-1", AgentRole::Nurture);
    let mut last = state.updated_at;
    for i in 0..50 {
        state.push_message(Speaker::Lead, format!("message {i}"));
        assert!(state.updated_at > last);
        last = state.updated_at;
    }
}

#[test]
fn test_next_version_when_clock_is_behind() {
    let future = now_micros() + Duration::seconds(60);
    let next = next_version(future);
    assert_eq!(next, future + Duration::microseconds(1));
}

#[test]
fn test_recent_lead_messages_window() {
    let mut state = ConversationState::new("conv-1", AgentRole::InboundQualifier);
    state.push_message(Speaker::Lead, "hi");
    state.push_message(Speaker::Agent, "hello! what brings you here?");
    state.push_message(Speaker::Lead, "pricing please");
    state.push_message(Speaker::Lead, "too expensive");

    assert_eq!(state.recent_lead_messages(1), vec!["too expensive"]);
    assert_eq!(
        state.recent_lead_messages(5),
        vec!["hi", "pricing please", "too expensive"]
    );
}

#[test]
fn test_merge_fields() {
    let mut state = ConversationState::new("conv-1", AgentRole::InboundQualifier);
    let before = state.updated_at;
    state.merge_fields(&BTreeMap::new());
    assert_eq!(state.updated_at, before);

    let mut fields = BTreeMap::new();
    fields.insert("budget".to_string(), "5k".to_string());
    let changed = state.merge_fields(&fields);
    assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["budget"]);
    assert_eq!(state.fields.get("budget").map(String::as_str), Some("5k"));
    assert!(state.updated_at > before);

    // same value again is not a change
    let stamped = state.updated_at;
    assert!(state.merge_fields(&fields).is_empty());
    assert_eq!(state.updated_at, stamped);
}

#[test]
fn test_state_serde_roundtrip_preserves_version() {
    let mut state = ConversationState::new("conv-1", AgentRole::InboundQualifier);
    state.push_message(Speaker::Lead, "hello");
    let json = serde_json::to_string(&state).unwrap();
    let back: ConversationState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}

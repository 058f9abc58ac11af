use super::*;

#[test]
fn test_persistence_conflict_message() {
    let error = Error::Handoff(HandoffError::PersistenceConflict {
        conversation_id: "conv-9".to_string(),
        attempts: 3,
    });

    assert!(error.user_message().contains("conv-9"));
    assert!(error.suggestion().unwrap().contains("Retry"));
}

#[test]
fn test_config_error_points_to_check() {
    let error = Error::Config(ConfigError::UnknownTrigger("ghost".to_string()));
    let output = format_error_for_cli(&error);
    assert!(output.contains("ghost"));
    assert!(output.contains("leadflow check"));
}

#[test]
fn test_store_error_converts_into_handoff_error() {
    let handoff: HandoffError = StoreError::Backend("disk full".to_string()).into();
    assert!(matches!(handoff, HandoffError::Store(StoreError::Backend(_))));
    assert!(handoff.to_string().contains("disk full"));
}

#[test]
fn test_terminal_violation_display() {
    let error = HandoffError::TerminalStateViolation {
        conversation_id: "conv-1".to_string(),
        role: AgentRole::ClosedWon,
        trigger: "ready to book".to_string(),
    };
    let text = error.to_string();
    assert!(text.contains("closed-won"));
    assert!(text.contains("ready to book"));
}

#[test]
fn test_store_and_script_errors_have_suggestions() {
    let store = Error::Store(StoreError::Backend("database is locked".to_string()));
    assert!(store.user_message().contains("database is locked"));
    assert!(store.suggestion().unwrap().contains("[store]"));

    let script = Error::Script("missing field `steps`".to_string());
    assert!(format_error_for_cli(&script).contains("missing field `steps`"));
    assert!(script.suggestion().unwrap().contains("conversation_id"));
}

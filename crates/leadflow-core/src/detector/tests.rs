use super::*;
use crate::role::AgentRole;
use crate::testing::sample_table;
use async_trait::async_trait;
use leadflow_llm::{MockProvider, MockReply};

enum Behavior {
    Answer(Option<Verdict>),
    Fail,
    Hang,
}

struct StubClassifier(Behavior);

#[async_trait]
impl Classifier for StubClassifier {
    fn name(&self) -> &str {
        "stub"
    }

    async fn classify(&self, _ctx: &DetectionContext) -> Result<Option<Verdict>, ClassifierError> {
        match &self.0 {
            Behavior::Answer(verdict) => Ok(verdict.clone()),
            Behavior::Fail => Err(ClassifierError::Transport("connection reset".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }
    }
}

fn ctx(messages: &[&str]) -> DetectionContext {
    messages
        .iter()
        .fold(DetectionContext::new("conv-1", AgentRole::InboundQualifier), |c, m| {
            c.with_message(*m)
        })
}

fn detector_with(behavior: Behavior) -> TriggerDetector {
    TriggerDetector::new(sample_table())
        .with_classifier(Arc::new(StubClassifier(behavior)))
        .with_config(DetectorConfig {
            scan_window: 3,
            classifier_timeout_ms: 50,
        })
}

#[tokio::test]
async fn test_keyword_match() {
    let detector = TriggerDetector::new(sample_table());
    let detection = detector.detect(&ctx(&["Honestly this is too expensive"])).await;

    let best = detection.best().unwrap();
    assert_eq!(best.trigger, "pricing objection detected");
    assert_eq!(best.source, MatchSource::Keyword);
    assert_eq!(detection.matches.len(), 1);
    assert!(detection.classifier_error.is_none());
}

#[tokio::test]
async fn test_higher_priority_first() {
    let detector = TriggerDetector::new(sample_table());
    let detection = detector
        .detect(&ctx(&["The price is high, but can we book a call?"]))
        .await;
    assert_eq!(
        detection.trigger_names(),
        vec!["ready to book", "pricing objection detected"]
    );
}

#[tokio::test]
async fn test_equal_priority_uses_declaration_order() {
    let detector = TriggerDetector::new(sample_table());
    let detection = detector
        .detect(&ctx(&["We are already using a competitor and it is too expensive"]))
        .await;
    assert_eq!(
        detection.trigger_names(),
        vec!["pricing objection detected", "competitor mentioned"]
    );
}

#[tokio::test]
async fn test_pattern_match() {
    let detector = TriggerDetector::new(sample_table());
    let detection = detector.detect(&ctx(&["I'm available on Thursday"])).await;
    let best = detection.best().unwrap();
    assert_eq!(best.trigger, "ready to book");
    assert_eq!(best.source, MatchSource::Pattern);
}

#[tokio::test]
async fn test_field_rule_needs_every_field() {
    let detector = TriggerDetector::new(sample_table());

    let partial = DetectionContext::new("conv-1", AgentRole::InboundQualifier)
        .with_field("budget_confirmed", "yes");
    assert!(detector.detect(&partial).await.is_empty());

    let full = partial.with_field("decision_maker", "YES");
    let detection = detector.detect(&full).await;
    assert_eq!(detection.trigger_names(), vec!["qualified"]);
    assert_eq!(detection.matches[0].source, MatchSource::Fields);
}

#[tokio::test]
async fn test_field_rule_needs_a_fresh_field() {
    let detector = TriggerDetector::new(sample_table());
    let mut state = crate::conversation::ConversationState::new("conv-1", AgentRole::Nurture);
    state.fields.insert("budget_confirmed".to_string(), "yes".to_string());
    state.fields.insert("decision_maker".to_string(), "yes".to_string());

    let stale = detector.context_for(&state);
    assert!(detector.detect(&stale).await.is_empty());

    let fresh = stale.with_changed_fields(["decision_maker".to_string()]);
    assert_eq!(detector.detect(&fresh).await.trigger_names(), vec!["qualified"]);

    let unrelated = detector
        .context_for(&state)
        .with_changed_fields(["company_size".to_string()]);
    assert!(detector.detect(&unrelated).await.is_empty());
}

#[tokio::test]
async fn test_scan_window_limits_history() {
    let detector = TriggerDetector::new(sample_table()).with_config(DetectorConfig {
        scan_window: 3,
        ..DetectorConfig::default()
    });
    let mut state = crate::conversation::ConversationState::new("conv-1", AgentRole::Nurture);
    for text in ["too expensive", "ok", "tell me more", "and the onboarding?"] {
        state.push_message(crate::conversation::Speaker::Lead, text);
    }
    let context = detector.context_for(&state);
    assert_eq!(context.messages, vec!["ok", "tell me more", "and the onboarding?"]);
    assert!(detector.detect(&context).await.is_empty());

    state.push_message(crate::conversation::Speaker::Lead, "fine, but the price?");
    let context = detector.context_for(&state);
    assert_eq!(context.messages.len(), 3);
    assert_eq!(
        detector.detect(&context).await.trigger_names(),
        vec!["pricing objection detected"]
    );
}

#[tokio::test]
async fn test_classifier_label_adds_match() {
    let detector = detector_with(Behavior::Answer(Some(Verdict::new("Not Ready", 0.8))));
    let detection = detector.detect(&ctx(&["let me think about it"])).await;

    let best = detection.best().unwrap();
    assert_eq!(best.trigger, "not ready");
    assert_eq!(best.source, MatchSource::Classifier);
    assert!((best.confidence - 0.8).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_same_trigger_reported_once() {
    let detector = detector_with(Behavior::Answer(Some(Verdict::new(
        "pricing objection detected",
        0.6,
    ))));
    let detection = detector.detect(&ctx(&["too expensive"])).await;
    assert_eq!(detection.matches.len(), 1);
    assert_eq!(detection.matches[0].source, MatchSource::Keyword);
}

#[tokio::test(start_paused = true)]
async fn test_classifier_timeout_keeps_rule_matches() {
    let detector = detector_with(Behavior::Hang);
    let detection = detector.detect(&ctx(&["that sounds good"])).await;

    assert_eq!(detection.trigger_names(), vec!["objection resolved"]);
    assert!(matches!(
        detection.classifier_error,
        Some(HandoffError::ClassificationUnavailable { ref reason, .. }) if reason.contains("timed out")
    ));
}

#[tokio::test]
async fn test_classifier_error_is_no_match() {
    let detector = detector_with(Behavior::Fail);
    let detection = detector.detect(&ctx(&["hello"])).await;
    assert!(detection.is_empty());
    assert!(detection.classifier_error.is_some());
}

#[tokio::test]
async fn test_unknown_label_is_dropped() {
    let detector = detector_with(Behavior::Answer(Some(Verdict::new("wants a discount", 0.9))));
    let detection = detector.detect(&ctx(&["hello"])).await;
    assert!(detection.is_empty());
    assert!(matches!(
        detection.classifier_error,
        Some(HandoffError::ClassificationUnavailable { ref classifier, .. }) if classifier == "stub"
    ));
}

#[tokio::test]
async fn test_llm_classifier_parses_answer() {
    let provider = Arc::new(MockProvider::new());
    provider.push(MockReply::Text("  \"Ready to book.\"\n".to_string()));
    provider.push(MockReply::Text("none".to_string()));
    provider.push(MockReply::Text("upsell".to_string()));
    provider.push(MockReply::Fail("overloaded".to_string()));

    let classifier = LlmClassifier::new(provider.clone(), sample_table()).with_confidence(0.75);
    assert_eq!(classifier.name(), "llm:mock");
    let context = ctx(&["when can we talk?"]);

    let verdict = classifier.classify(&context).await.unwrap().unwrap();
    assert_eq!(verdict.label, "ready to book");
    assert!((verdict.confidence - 0.75).abs() < f32::EPSILON);

    assert_eq!(classifier.classify(&context).await.unwrap(), None);
    assert_eq!(
        classifier.classify(&context).await.unwrap_err(),
        ClassifierError::UnknownLabel("upsell".to_string())
    );
    assert!(matches!(
        classifier.classify(&context).await.unwrap_err(),
        ClassifierError::Transport(_)
    ));
    assert_eq!(provider.call_count(), 4);
}

#[tokio::test]
async fn test_llm_classifier_skips_empty_context() {
    let provider = Arc::new(MockProvider::new());
    let classifier = LlmClassifier::new(provider.clone(), sample_table());
    let empty = DetectionContext::new("conv-1", AgentRole::Closer);
    assert_eq!(classifier.classify(&empty).await.unwrap(), None);
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn test_llm_prompt_lists_labels() {
    let classifier = LlmClassifier::new(Arc::new(MockProvider::new()), sample_table());
    let prompt = classifier.prompt(&ctx(&["hi"]).with_field("budget_confirmed", "yes"));
    assert!(prompt.contains("Current agent: inbound-qualifier"));
    assert!(prompt.contains("- budget_confirmed: yes"));
    assert!(prompt.contains("- ready to book: The lead wants to schedule a call"));
}

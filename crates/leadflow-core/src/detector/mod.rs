//! Trigger detection
//!
//! [`TriggerDetector`] evaluates every trigger of the flow table against a
//! [`DetectionContext`] and returns all matches in precedence order. It holds
//! no mutable state and may be shared freely between tasks.
//!
//! Detection never fails. When the optional classifier times out, errors, or
//! answers with an unknown label, its contribution is dropped, a warning is
//! logged, and the rule-based matches are still returned.

mod classifier;
mod llm;
mod rules;
mod types;

pub use classifier::{Classifier, ClassifierError, SharedClassifier, Verdict};
pub use llm::LlmClassifier;
pub use rules::TriggerRule;
pub use types::{Detection, DetectionContext, MatchSource, TriggerMatch};

use crate::conversation::ConversationState;
use crate::error::HandoffError;
use crate::flow::FlowTable;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Detector settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// How many recent lead messages are scanned
    pub scan_window: usize,
    /// Upper bound for one classifier call
    pub classifier_timeout_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scan_window: 1,
            classifier_timeout_ms: 2_000,
        }
    }
}

/// Matches conversation context against the flow table's triggers
pub struct TriggerDetector {
    table: Arc<FlowTable>,
    classifier: Option<SharedClassifier>,
    config: DetectorConfig,
}

impl TriggerDetector {
    /// Rule-only detector
    #[must_use]
    pub fn new(table: Arc<FlowTable>) -> Self {
        Self {
            table,
            classifier: None,
            config: DetectorConfig::default(),
        }
    }

    /// Add a delegated classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: SharedClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replace the settings
    #[must_use]
    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current settings
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Context for a stored conversation using the configured scan window
    #[must_use]
    pub fn context_for(&self, state: &ConversationState) -> DetectionContext {
        DetectionContext::from_state(state, self.config.scan_window)
    }

    /// Evaluate all triggers
    pub async fn detect(&self, ctx: &DetectionContext) -> Detection {
        let (verdict, classifier_error) = match &self.classifier {
            Some(classifier) => match self.run_classifier(classifier.as_ref(), ctx).await {
                Ok(verdict) => (verdict, None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        let with_classifier = verdict.is_some();
        let mut matches: Vec<TriggerMatch> = self
            .table
            .triggers()
            .iter()
            .filter_map(|trigger| {
                TriggerRule::for_trigger(trigger, with_classifier)
                    .into_iter()
                    .filter_map(|rule| rule.evaluate(ctx, verdict.as_ref()))
                    // first rule wins confidence ties
                    .reduce(|best, next| if next.1 > best.1 { next } else { best })
                    .map(|(source, confidence)| TriggerMatch {
                        trigger: trigger.name.clone(),
                        priority: trigger.priority,
                        declared_at: trigger.declared_at,
                        confidence,
                        source,
                    })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.declared_at.cmp(&b.declared_at))
        });

        if !matches.is_empty() {
            debug!(
                conversation_id = %ctx.conversation_id,
                matches = ?matches.iter().map(|m| m.trigger.as_str()).collect::<Vec<_>>(),
                "Triggers detected"
            );
        }

        Detection {
            matches,
            classifier_error,
        }
    }

    async fn run_classifier(
        &self,
        classifier: &dyn Classifier,
        ctx: &DetectionContext,
    ) -> Result<Option<Verdict>, HandoffError> {
        let timeout = Duration::from_millis(self.config.classifier_timeout_ms);
        let outcome = match tokio::time::timeout(timeout, classifier.classify(ctx)).await {
            Ok(Ok(Some(verdict))) if self.table.trigger(&verdict.label).is_none() => {
                Err(ClassifierError::UnknownLabel(verdict.label))
            }
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.config.classifier_timeout_ms)),
        };

        outcome.map_err(|e| {
            warn!(
                conversation_id = %ctx.conversation_id,
                classifier = classifier.name(),
                error = %e,
                "Classifier unavailable, continuing with rule matches"
            );
            HandoffError::ClassificationUnavailable {
                classifier: classifier.name().to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests;

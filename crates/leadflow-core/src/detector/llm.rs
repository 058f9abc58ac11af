//! Classifier backed by an LLM provider

use super::classifier::{Classifier, ClassifierError, Verdict};
use super::types::DetectionContext;
use crate::flow::FlowTable;
use async_trait::async_trait;
use leadflow_llm::{CompletionRequest, Message, SharedProvider};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You route B2B sales conversations between agents. \
Read the lead's latest messages and answer with exactly one label from the list, \
or `none` if no label applies. Answer with the label only.";

const DEFAULT_CONFIDENCE: f32 = 0.7;

/// Asks a model which trigger label fits the conversation
pub struct LlmClassifier {
    provider: SharedProvider,
    table: Arc<FlowTable>,
    model: Option<String>,
    confidence: f32,
    name: String,
}

impl LlmClassifier {
    /// Classifier over the triggers of `table`
    #[must_use]
    pub fn new(provider: SharedProvider, table: Arc<FlowTable>) -> Self {
        let name = format!("llm:{}", provider.name());
        Self {
            provider,
            table,
            model: None,
            confidence: DEFAULT_CONFIDENCE,
            name,
        }
    }

    /// Override the provider's default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Confidence attached to every verdict
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub(super) fn prompt(&self, ctx: &DetectionContext) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Current agent: {}", ctx.current_role);
        if !ctx.fields.is_empty() {
            let _ = writeln!(prompt, "Known fields:");
            for (key, value) in &ctx.fields {
                let _ = writeln!(prompt, "- {key}: {value}");
            }
        }
        let _ = writeln!(prompt, "Lead messages (oldest first):");
        for message in &ctx.messages {
            let _ = writeln!(prompt, "- {message}");
        }
        let _ = writeln!(prompt, "Labels:");
        for trigger in self.table.triggers() {
            if trigger.description.is_empty() {
                let _ = writeln!(prompt, "- {}", trigger.name);
            } else {
                let _ = writeln!(prompt, "- {}: {}", trigger.name, trigger.description);
            }
        }
        prompt
    }

    /// Map raw model output to a declared trigger name
    fn parse_label(&self, raw: &str) -> Result<Option<String>, ClassifierError> {
        let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
        let label = line
            .trim_start_matches(|c: char| c == '-' || c.is_whitespace())
            .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
        let label = label
            .strip_prefix("label:")
            .or_else(|| label.strip_prefix("Label:"))
            .map_or(label, str::trim);

        if label.is_empty() {
            return Err(ClassifierError::Malformed("empty answer".to_string()));
        }
        if label.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        self.table
            .trigger(label)
            .map(|t| Some(t.name.clone()))
            .ok_or_else(|| ClassifierError::UnknownLabel(label.to_string()))
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, ctx), fields(conversation_id = %ctx.conversation_id))]
    async fn classify(&self, ctx: &DetectionContext) -> Result<Option<Verdict>, ClassifierError> {
        if ctx.messages.is_empty() {
            return Ok(None);
        }

        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());
        let request = CompletionRequest::new(model)
            .with_message(Message::system(SYSTEM_PROMPT))
            .with_message(Message::user(self.prompt(ctx)))
            .with_max_tokens(16)
            .with_temperature(0.0);

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let label = self.parse_label(&response.content)?;
        debug!(answer = %response.content.trim(), label = ?label, "Classifier answered");
        Ok(label.map(|label| Verdict::new(label, self.confidence)))
    }
}

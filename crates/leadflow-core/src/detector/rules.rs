//! Rule evaluation
//!
//! Every trigger expands into a list of [`TriggerRule`]s. The synchronous rules
//! look at the context directly; [`TriggerRule::Classified`] only looks at the
//! verdict the classifier already returned for this context.

use super::classifier::Verdict;
use super::types::{DetectionContext, MatchSource};
use crate::flow::{HandoffTrigger, Keyword};
use regex::Regex;
use std::collections::BTreeMap;

/// Closed set of matching capabilities
#[derive(Debug, Clone, Copy)]
pub enum TriggerRule<'a> {
    /// Keyword phrase in any scanned message
    Keyword(&'a Keyword),
    /// Regex match in any scanned message
    Pattern(&'a Regex),
    /// All listed fields hold the listed values and one of them just changed
    Fields(&'a BTreeMap<String, String>),
    /// Classifier label equals the trigger name
    Classified(&'a str),
}

const KEYWORD_CONFIDENCE: f32 = 1.0;
const PATTERN_CONFIDENCE: f32 = 0.9;
const FIELDS_CONFIDENCE: f32 = 1.0;

impl<'a> TriggerRule<'a> {
    /// Rules for one trigger, in evaluation order
    #[must_use]
    pub fn for_trigger(trigger: &'a HandoffTrigger, with_classifier: bool) -> Vec<Self> {
        let mut rules: Vec<Self> = trigger.keywords.iter().map(Self::Keyword).collect();
        rules.extend(trigger.patterns.iter().map(Self::Pattern));
        if !trigger.fields.is_empty() {
            rules.push(Self::Fields(&trigger.fields));
        }
        if with_classifier {
            rules.push(Self::Classified(&trigger.name));
        }
        rules
    }

    /// Source and confidence if the rule holds
    #[must_use]
    pub fn evaluate(
        &self,
        ctx: &DetectionContext,
        verdict: Option<&Verdict>,
    ) -> Option<(MatchSource, f32)> {
        match self {
            Self::Keyword(keyword) => ctx
                .messages
                .iter()
                .any(|m| keyword.is_match(m))
                .then_some((MatchSource::Keyword, KEYWORD_CONFIDENCE)),
            Self::Pattern(pattern) => ctx
                .messages
                .iter()
                .any(|m| pattern.is_match(m))
                .then_some((MatchSource::Pattern, PATTERN_CONFIDENCE)),
            Self::Fields(required) => {
                let holds = required.iter().all(|(key, want)| {
                    ctx.fields
                        .get(key)
                        .is_some_and(|have| have.trim().eq_ignore_ascii_case(want.trim()))
                });
                // fields persist across turns; fire only on the message that set them
                let fresh = required.keys().any(|key| ctx.changed_fields.contains(key));
                (holds && fresh).then_some((MatchSource::Fields, FIELDS_CONFIDENCE))
            }
            Self::Classified(name) => verdict
                .filter(|v| v.label.eq_ignore_ascii_case(name))
                .map(|v| (MatchSource::Classifier, v.confidence.clamp(0.0, 1.0))),
        }
    }
}

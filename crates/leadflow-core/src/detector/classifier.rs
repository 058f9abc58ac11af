//! Delegated classification
//!
//! A classifier maps a context to at most one trigger label. It is the only
//! place the detector waits on anything external, so the detector bounds
//! every call with a timeout and treats any failure as "no label".

use super::types::DetectionContext;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// A classifier answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Trigger name
    pub label: String,
    /// 0.0 to 1.0
    pub confidence: f32,
}

impl Verdict {
    /// Create a verdict
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Why a classifier produced nothing usable
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    /// Call did not finish in time
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Backend call failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Output could not be interpreted
    #[error("malformed output: {0}")]
    Malformed(String),

    /// Label is not a declared trigger
    #[error("unknown label '{0}'")]
    UnknownLabel(String),
}

/// Narrow classification interface
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Classify a context; `Ok(None)` means no trigger applies
    async fn classify(&self, ctx: &DetectionContext) -> Result<Option<Verdict>, ClassifierError>;
}

/// Shared classifier handle
pub type SharedClassifier = Arc<dyn Classifier>;

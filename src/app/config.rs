//! Application configuration types

use leadflow_core::detector::DetectorConfig;
use leadflow_core::event_bus::WebhookConfig;
use leadflow_core::flow::FlowConfig;
use leadflow_core::router::RouterConfig;
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub detector: DetectorSection,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub flow: FlowConfig,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite file; defaults to ~/.leadflow/leadflow.db
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSection {
    #[serde(default = "default_scan_window")]
    pub scan_window: usize,
    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,
    #[serde(default)]
    pub llm: LlmClassifierConfig,
}

fn default_scan_window() -> usize {
    DetectorConfig::default().scan_window
}

fn default_classifier_timeout_ms() -> u64 {
    DetectorConfig::default().classifier_timeout_ms
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            scan_window: default_scan_window(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
            llm: LlmClassifierConfig::default(),
        }
    }
}

impl DetectorSection {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            scan_window: self.scan_window,
            classifier_timeout_ms: self.classifier_timeout_ms,
        }
    }
}

/// LLM classifier (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmClassifierConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_confidence() -> f32 {
    0.7
}

impl Default for LlmClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            model: None,
            api_key_env: default_api_key_env(),
            confidence: default_confidence(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

fn default_event_bus_capacity() -> usize {
    256
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
            webhook: None,
        }
    }
}

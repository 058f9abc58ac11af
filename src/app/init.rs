//! Engine wiring
//!
//! Builds the store, detector, router and engine described by [`AppConfig`].

use super::config::{AppConfig, LlmClassifierConfig, StoreBackend};
use anyhow::{Context, Result};
use leadflow_core::{
    EventBus, FlowEngine, FlowRouter, FlowTable, LlmClassifier, MemoryStore, SharedStore,
    SqliteStore, TriggerDetector, WebhookNotifier,
};
use leadflow_llm::{OpenAiCompatConfig, OpenAiCompatProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Validate the flow section into a table
pub fn load_table(config: &AppConfig) -> Result<Arc<FlowTable>> {
    let table = FlowTable::from_config(&config.flow).context("Invalid [flow] configuration")?;
    Ok(Arc::new(table))
}

/// Open the configured store
pub async fn init_store(config: &AppConfig) -> Result<SharedStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory conversation store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let store = match &config.store.path {
                Some(path) => SqliteStore::new(path).await,
                None => SqliteStore::new_default().await,
            }
            .context("Failed to open SQLite conversation store")?;
            Ok(Arc::new(store))
        }
    }
}

fn init_classifier(
    config: &LlmClassifierConfig,
    table: Arc<FlowTable>,
    timeout: Duration,
) -> Result<LlmClassifier> {
    let mut provider_config = OpenAiCompatConfig::new().with_timeout(timeout);
    if let Some(url) = &config.base_url {
        provider_config = provider_config.with_base_url(url.clone());
    }
    if let Some(model) = &config.model {
        provider_config = provider_config.with_model(model.clone());
    }
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => provider_config = provider_config.with_api_key(key),
        _ => warn!(env = %config.api_key_env, "No API key found for the LLM classifier"),
    }

    let provider = OpenAiCompatProvider::new(provider_config)
        .context("Failed to create LLM provider")?;
    Ok(LlmClassifier::new(Arc::new(provider), table).with_confidence(config.confidence))
}

/// Build the engine over an already opened store
pub fn build_engine(config: &AppConfig, table: Arc<FlowTable>, store: SharedStore) -> Result<FlowEngine> {
    let detector_config = config.detector.detector_config();
    let mut detector = TriggerDetector::new(table.clone()).with_config(detector_config.clone());
    if config.detector.llm.enabled {
        let classifier = init_classifier(
            &config.detector.llm,
            table.clone(),
            Duration::from_millis(detector_config.classifier_timeout_ms),
        )?;
        info!("LLM classifier enabled");
        detector = detector.with_classifier(Arc::new(classifier));
    }

    let mut router = FlowRouter::new(table, store)
        .with_config(config.router.clone())
        .with_event_bus(EventBus::new(config.notify.event_bus_capacity));
    if let Some(webhook) = &config.notify.webhook {
        let notifier = WebhookNotifier::new(webhook).context("Failed to create webhook client")?;
        info!(url = %notifier.url(), "Webhook notifications enabled");
        router = router.with_notifier(Arc::new(notifier));
    }

    Ok(FlowEngine::new(Arc::new(detector), router))
}

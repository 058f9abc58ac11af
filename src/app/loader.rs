//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. Project overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("LEADFLOW_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        .add_source(File::with_name("config/local").required(false));

    // 3. File given on the command line
    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    // 4. Environment variables (highest priority), e.g. LEADFLOW_STORE__BACKEND
    let config = builder
        .add_source(
            Environment::with_prefix("LEADFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::StoreBackend;
    use leadflow_core::FlowTable;

    #[test]
    fn test_embedded_defaults_are_valid() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert!(!config.detector.llm.enabled);
        assert!(config.notify.webhook.is_none());

        let table = FlowTable::from_config(&config.flow).unwrap();
        assert!(table.trigger("pricing objection detected").is_some());
        assert_eq!(table.closing_trigger(true), Some("deal won"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("override.toml");
        std::fs::write(
            &path,
            "[store]\nbackend = \"memory\"\n\n[router.retry]\nmax_attempts = 9\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.router.retry.max_attempts, 9);
        // untouched sections keep the embedded values
        assert!(!config.flow.triggers.is_empty());
    }
}

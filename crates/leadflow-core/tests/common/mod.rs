//! Shared helpers for integration tests

#![allow(dead_code)]

use leadflow_core::{FlowRouter, FlowTable, RetryConfig, RouterConfig, SharedStore};
use std::sync::Arc;
use std::time::Duration;

pub const FLOW: &str = include_str!("../fixtures/flow.toml");

pub fn table() -> Arc<FlowTable> {
    Arc::new(FlowTable::from_toml_str(FLOW).unwrap())
}

pub fn fast_router_config(max_attempts: u32) -> RouterConfig {
    RouterConfig {
        retry: RetryConfig::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false),
    }
}

pub fn router(store: SharedStore) -> FlowRouter {
    FlowRouter::new(table(), store).with_config(fast_router_config(3))
}

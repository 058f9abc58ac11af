//! Application setup: configuration and engine wiring

pub mod config;
pub mod init;
pub mod loader;

pub use config::AppConfig;
pub use init::{build_engine, init_store, load_table};
pub use loader::load_config;

//! Flow events and transition notifications
//!
//! The router publishes a [`FlowEvent`] for every routing decision that is
//! worth observing. Subscribers that fall behind miss events instead of
//! slowing the router down.

/// Broadcast channel.
pub mod bus;
/// Fire-and-forget transition sinks.
pub mod notifier;
/// Event definitions.
pub mod types;

pub use bus::EventBus;
pub use notifier::{Notifier, SharedNotifier, WebhookConfig, WebhookNotifier};
pub use types::FlowEvent;

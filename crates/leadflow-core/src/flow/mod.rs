//! Flow table
//!
//! The declarative configuration of which trigger moves a conversation from
//! one role to the next. It is parsed once at startup ([`FlowConfig`]) and
//! validated into an immutable [`FlowTable`] that is shared by `Arc` with the
//! detector and the router.
//!
//! ```toml
//! initial_role = "inbound-qualifier"
//!
//! [[triggers]]
//! name = "pricing objection detected"
//! priority = 50
//! keywords = ["too expensive", "pricing"]
//! target = "objection-handler"
//!
//! [[transitions]]
//! from = "objection-handler"
//! trigger = "ready to book"
//! to = "booking"
//! ```

mod config;
mod table;

pub use config::{ConfigError, FlowConfig, RoleProfileConfig, TransitionConfig, TriggerConfig};
pub use table::{FlowTable, HandoffTrigger, Keyword, RoutePlan, TableRow};

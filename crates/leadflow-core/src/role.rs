//! Agent roles
//!
//! The set of agent roles is closed: every conversation is owned by exactly one
//! [`AgentRole`] at a time. Role-specific behavior (prompt key, display name,
//! description) is looked up in a [`RoleDirectory`] rather than attached to
//! per-role handler types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Agent role assigned to a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    /// First contact; qualifies inbound leads
    InboundQualifier,
    /// Keeps warm leads engaged until they are ready
    Nurture,
    /// Handles pricing, timing and competitor objections
    ObjectionHandler,
    /// Pushes qualified leads towards a decision
    Closer,
    /// Schedules the sales call
    Booking,
    /// Terminal: deal won
    ClosedWon,
    /// Terminal: deal lost
    ClosedLost,
}

impl AgentRole {
    /// All roles in declaration order
    pub const ALL: [AgentRole; 7] = [
        AgentRole::InboundQualifier,
        AgentRole::Nurture,
        AgentRole::ObjectionHandler,
        AgentRole::Closer,
        AgentRole::Booking,
        AgentRole::ClosedWon,
        AgentRole::ClosedLost,
    ];

    /// Stable identifier used in configuration and storage
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InboundQualifier => "inbound-qualifier",
            Self::Nurture => "nurture",
            Self::ObjectionHandler => "objection-handler",
            Self::Closer => "closer",
            Self::Booking => "booking",
            Self::ClosedWon => "closed-won",
            Self::ClosedLost => "closed-lost",
        }
    }

    /// Terminal roles close the conversation and have no outgoing transitions
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown role identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for AgentRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "inbound-qualifier" | "qualifier" => Ok(Self::InboundQualifier),
            "nurture" => Ok(Self::Nurture),
            "objection-handler" => Ok(Self::ObjectionHandler),
            "closer" => Ok(Self::Closer),
            "booking" => Ok(Self::Booking),
            "closed-won" | "won" => Ok(Self::ClosedWon),
            "closed-lost" | "lost" => Ok(Self::ClosedLost),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

/// Per-role behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// Human readable name shown in alerts
    pub display_name: String,
    /// Key of the prompt template the agent runtime loads for this role
    pub prompt_key: String,
    /// Short description of the role's responsibility
    #[serde(default)]
    pub description: String,
}

impl RoleProfile {
    fn builtin(role: AgentRole) -> Self {
        let (display_name, description) = match role {
            AgentRole::InboundQualifier => ("Inbound Qualifier", "Qualifies new inbound leads"),
            AgentRole::Nurture => ("Nurture", "Keeps warm leads engaged"),
            AgentRole::ObjectionHandler => ("Objection Handler", "Resolves lead objections"),
            AgentRole::Closer => ("Closer", "Drives qualified leads to a decision"),
            AgentRole::Booking => ("Booking", "Schedules the sales call"),
            AgentRole::ClosedWon => ("Closed Won", "Conversation closed as won"),
            AgentRole::ClosedLost => ("Closed Lost", "Conversation closed as lost"),
        };
        Self {
            display_name: display_name.to_string(),
            prompt_key: role.as_str().replace('-', "_"),
            description: description.to_string(),
        }
    }
}

/// Lookup table from role to its profile
#[derive(Debug, Clone)]
pub struct RoleDirectory {
    profiles: BTreeMap<AgentRole, RoleProfile>,
}

impl RoleDirectory {
    /// Directory with built-in profiles for every role
    #[must_use]
    pub fn builtin() -> Self {
        let profiles = AgentRole::ALL
            .iter()
            .map(|role| (*role, RoleProfile::builtin(*role)))
            .collect();
        Self { profiles }
    }

    /// Replace the profile of one role
    pub fn set(&mut self, role: AgentRole, profile: RoleProfile) {
        self.profiles.insert(role, profile);
    }

    /// Profile for a role (always present)
    #[must_use]
    pub fn profile(&self, role: AgentRole) -> &RoleProfile {
        // builtin() seeds every variant and set() never removes
        &self.profiles[&role]
    }

    /// Iterate profiles in role order
    pub fn iter(&self) -> impl Iterator<Item = (&AgentRole, &RoleProfile)> {
        self.profiles.iter()
    }
}

impl Default for RoleDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

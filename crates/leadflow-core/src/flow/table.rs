//! Validated, immutable flow table

use super::config::{ConfigError, FlowConfig};
use crate::role::{AgentRole, RoleDirectory, RoleProfile};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A keyword phrase and its compiled word-boundary matcher
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Phrase as configured
    pub phrase: String,
    matcher: Regex,
}

impl Keyword {
    fn new(phrase: &str) -> Result<Self, regex::Error> {
        let matcher = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase.trim())))?;
        Ok(Self {
            phrase: phrase.trim().to_string(),
            matcher,
        })
    }

    /// Whether the phrase occurs in `text` on word boundaries, ignoring case
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// A named handoff condition
#[derive(Debug, Clone)]
pub struct HandoffTrigger {
    /// Unique name
    pub name: String,
    /// Higher wins when several triggers match
    pub priority: i32,
    /// Position in the configuration; lower wins priority ties
    pub declared_at: usize,
    /// Free text shown to the classifier model
    pub description: String,
    /// Default destination from any non-terminal role
    pub target: Option<AgentRole>,
    /// Keyword phrases
    pub keywords: Vec<Keyword>,
    /// Regex patterns
    pub patterns: Vec<Regex>,
    /// Required qualification field values
    pub fields: BTreeMap<String, String>,
}

/// Routing decision for (current role, trigger)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePlan {
    /// Hand off to `to`
    Transition {
        /// Destination role
        to: AgentRole,
    },
    /// Destination equals current role
    SelfTransition,
    /// Current role is terminal; nothing may leave it
    Terminal,
    /// No table entry for (current role, trigger)
    Invalid,
}

/// One resolved row of the table, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Source role; `None` means any non-terminal role
    pub from: Option<AgentRole>,
    /// Trigger name
    pub trigger: String,
    /// Destination role
    pub to: AgentRole,
}

/// Immutable mapping (current role, trigger) -> next role
#[derive(Debug, Clone)]
pub struct FlowTable {
    initial_role: AgentRole,
    triggers: Vec<HandoffTrigger>,
    by_name: HashMap<String, usize>,
    explicit: HashMap<(AgentRole, usize), AgentRole>,
    wildcard: HashMap<usize, AgentRole>,
    won_trigger: Option<String>,
    lost_trigger: Option<String>,
    roles: RoleDirectory,
}

fn parse_role(value: &str) -> Result<AgentRole, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::UnknownRole(value.to_string()))
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl FlowTable {
    /// Validate a configuration into a table
    pub fn from_config(config: &FlowConfig) -> Result<Self, ConfigError> {
        let initial_role = parse_role(&config.initial_role)?;
        if initial_role.is_terminal() {
            return Err(ConfigError::TerminalInitialRole(config.initial_role.clone()));
        }

        let mut triggers = Vec::with_capacity(config.triggers.len());
        let mut by_name = HashMap::new();
        let mut wildcard = HashMap::new();

        for (declared_at, tc) in config.triggers.iter().enumerate() {
            let key = name_key(&tc.name);
            if by_name.insert(key, declared_at).is_some() {
                return Err(ConfigError::DuplicateTrigger(tc.name.clone()));
            }

            let invalid = |e: regex::Error| ConfigError::InvalidPattern {
                trigger: tc.name.clone(),
                reason: e.to_string(),
            };
            let keywords = tc
                .keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .map(|k| Keyword::new(k))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;
            let patterns = tc
                .patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;

            let target = tc.target.as_deref().map(parse_role).transpose()?;
            if let Some(to) = target {
                wildcard.insert(declared_at, to);
            }

            triggers.push(HandoffTrigger {
                name: tc.name.trim().to_string(),
                priority: tc.priority,
                declared_at,
                description: tc.description.clone(),
                target,
                keywords,
                patterns,
                fields: tc.fields.clone(),
            });
        }

        let mut explicit = HashMap::new();
        for row in &config.transitions {
            let idx = *by_name
                .get(&name_key(&row.trigger))
                .ok_or_else(|| ConfigError::UnknownTrigger(row.trigger.clone()))?;
            let to = parse_role(&row.to)?;

            if row.from.trim() == "*" {
                // `target` and `*` rows share one slot per trigger
                if wildcard.insert(idx, to).is_some() {
                    return Err(ConfigError::DuplicateTransition {
                        from: row.from.clone(),
                        trigger: row.trigger.clone(),
                    });
                }
                continue;
            }

            let from = parse_role(&row.from)?;
            if from.is_terminal() {
                return Err(ConfigError::TerminalSource {
                    from: row.from.clone(),
                    trigger: row.trigger.clone(),
                });
            }
            if explicit.insert((from, idx), to).is_some() {
                return Err(ConfigError::DuplicateTransition {
                    from: row.from.clone(),
                    trigger: row.trigger.clone(),
                });
            }
        }

        for closing in [&config.won_trigger, &config.lost_trigger].into_iter().flatten() {
            if !by_name.contains_key(&name_key(closing)) {
                return Err(ConfigError::UnknownTrigger(closing.clone()));
            }
        }

        let mut roles = RoleDirectory::builtin();
        for rc in &config.roles {
            roles.set(
                parse_role(&rc.role)?,
                RoleProfile {
                    display_name: rc.display_name.clone(),
                    prompt_key: rc.prompt_key.clone(),
                    description: rc.description.clone(),
                },
            );
        }

        debug!(
            triggers = triggers.len(),
            explicit_rows = explicit.len(),
            wildcard_rows = wildcard.len(),
            "Flow table loaded"
        );

        Ok(Self {
            initial_role,
            triggers,
            by_name,
            explicit,
            wildcard,
            won_trigger: config.won_trigger.clone(),
            lost_trigger: config.lost_trigger.clone(),
            roles,
        })
    }

    /// Parse and validate a standalone flow TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_config(&FlowConfig::from_toml_str(text)?)
    }

    /// Role for new conversations without an inbound classification
    #[must_use]
    pub fn initial_role(&self) -> AgentRole {
        self.initial_role
    }

    /// Triggers in declaration order
    #[must_use]
    pub fn triggers(&self) -> &[HandoffTrigger] {
        &self.triggers
    }

    /// Look up a trigger by name (case-insensitive)
    #[must_use]
    pub fn trigger(&self, name: &str) -> Option<&HandoffTrigger> {
        self.by_name.get(&name_key(name)).map(|&i| &self.triggers[i])
    }

    /// Trigger used to close a conversation as won or lost
    #[must_use]
    pub fn closing_trigger(&self, won: bool) -> Option<&str> {
        if won {
            self.won_trigger.as_deref()
        } else {
            self.lost_trigger.as_deref()
        }
    }

    /// Role profiles
    #[must_use]
    pub fn roles(&self) -> &RoleDirectory {
        &self.roles
    }

    /// Decide what `trigger` does to a conversation owned by `current`
    #[must_use]
    pub fn plan(&self, current: AgentRole, trigger: &str) -> RoutePlan {
        if current.is_terminal() {
            return RoutePlan::Terminal;
        }
        let Some(&idx) = self.by_name.get(&name_key(trigger)) else {
            return RoutePlan::Invalid;
        };
        let to = self
            .explicit
            .get(&(current, idx))
            .or_else(|| self.wildcard.get(&idx));
        match to {
            None => RoutePlan::Invalid,
            Some(&to) if to == current => RoutePlan::SelfTransition,
            Some(&to) => RoutePlan::Transition { to },
        }
    }

    /// All rows, explicit first (sorted by role then trigger), then wildcards
    #[must_use]
    pub fn rows(&self) -> Vec<TableRow> {
        let mut explicit: Vec<TableRow> = self
            .explicit
            .iter()
            .map(|(&(from, idx), &to)| TableRow {
                from: Some(from),
                trigger: self.triggers[idx].name.clone(),
                to,
            })
            .collect();
        explicit.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.trigger.cmp(&b.trigger)));

        let mut wildcard: Vec<(usize, AgentRole)> =
            self.wildcard.iter().map(|(&i, &to)| (i, to)).collect();
        wildcard.sort_by_key(|(i, _)| *i);

        explicit.extend(wildcard.into_iter().map(|(idx, to)| TableRow {
            from: None,
            trigger: self.triggers[idx].name.clone(),
            to,
        }));
        explicit
    }
}

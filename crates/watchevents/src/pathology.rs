//! Pathology oracle
//!
//! Decides whether an event pattern is known/expected. The engine only
//! consumes the yes/no answer; rule content is supplied by the caller, either
//! through a custom [`PathologyOracle`] or as regex matchers in configuration
//! ([`RuleSetOracle`]).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{MatcherConfig, PathologyConfig};
use crate::error::PatternError;
use crate::message::Message;

/// Repeat count above which an event is flagged pathological.
pub const DEFAULT_DUPLICATE_EVENT_THRESHOLD: i32 = 20;

/// Control-plane redundancy shape of the cluster under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyMode {
    HighlyAvailable,
    SingleReplica,
    External,
    /// Not known (fetch failed or not yet fetched).
    #[default]
    Unset,
}

impl TopologyMode {
    /// Parse the value reported by the cluster infrastructure resource.
    #[must_use]
    pub fn from_cluster_str(value: &str) -> Self {
        match value {
            "HighlyAvailable" => Self::HighlyAvailable,
            "SingleReplica" => Self::SingleReplica,
            "External" => Self::External,
            _ => Self::Unset,
        }
    }
}

/// Metadata about the rule that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRule {
    pub name: String,
}

/// Classifies event patterns as known/expected.
pub trait PathologyOracle: Send + Sync {
    /// First rule matching the event, if any.
    fn matches_any(
        &self,
        locator: &str,
        message: &Message,
        topology: TopologyMode,
    ) -> Option<MatchedRule>;
}

/// One known event pattern. Every condition that is set must hold.
#[derive(Debug, Clone)]
pub struct PathologicalEventMatcher {
    name: String,
    locator: Option<Regex>,
    reason: Option<Regex>,
    message: Option<Regex>,
    topology: Option<TopologyMode>,
}

fn compile(matcher: &str, field: &str, pattern: Option<&str>) -> Result<Option<Regex>, PatternError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| {
                PatternError::InvalidRegex(format!("matcher {matcher} field {field}: {e}"))
            })
        })
        .transpose()
}

impl PathologicalEventMatcher {
    pub fn from_config(config: &MatcherConfig) -> Result<Self, PatternError> {
        if config.name.trim().is_empty() {
            return Err(PatternError::InvalidRule("matcher name is empty".to_string()));
        }
        if config.locator.is_none() && config.reason.is_none() && config.message.is_none() {
            return Err(PatternError::InvalidRule(format!(
                "matcher {} has no locator, reason or message condition",
                config.name
            )));
        }
        Ok(Self {
            name: config.name.clone(),
            locator: compile(&config.name, "locator", config.locator.as_deref())?,
            reason: compile(&config.name, "reason", config.reason.as_deref())?,
            message: compile(&config.name, "message", config.message.as_deref())?,
            topology: config.topology,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn matches(&self, locator: &str, message: &Message, topology: TopologyMode) -> bool {
        if let Some(required) = self.topology {
            if required != topology {
                return false;
            }
        }
        if let Some(re) = &self.locator {
            if !re.is_match(locator) {
                return false;
            }
        }
        if let Some(re) = &self.reason {
            if !re.is_match(message.reason.as_deref().unwrap_or_default()) {
                return false;
            }
        }
        if let Some(re) = &self.message {
            if !re.is_match(&message.human) {
                return false;
            }
        }
        true
    }
}

/// Oracle over the steady-state and upgrade matcher lists.
#[derive(Debug, Clone, Default)]
pub struct RuleSetOracle {
    steady_state: Vec<PathologicalEventMatcher>,
    upgrade: Vec<PathologicalEventMatcher>,
}

impl RuleSetOracle {
    #[must_use]
    pub fn new(
        steady_state: Vec<PathologicalEventMatcher>,
        upgrade: Vec<PathologicalEventMatcher>,
    ) -> Self {
        Self {
            steady_state,
            upgrade,
        }
    }

    pub fn from_config(config: &PathologyConfig) -> Result<Self, PatternError> {
        let build = |list: &[MatcherConfig]| {
            list.iter()
                .map(PathologicalEventMatcher::from_config)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self::new(build(&config.steady_state)?, build(&config.upgrade)?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steady_state.len() + self.upgrade.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PathologyOracle for RuleSetOracle {
    fn matches_any(
        &self,
        locator: &str,
        message: &Message,
        topology: TopologyMode,
    ) -> Option<MatchedRule> {
        self.steady_state
            .iter()
            .chain(&self.upgrade)
            .find(|m| m.matches(locator, message, topology))
            .map(|m| MatchedRule {
                name: m.name.clone(),
            })
    }
}

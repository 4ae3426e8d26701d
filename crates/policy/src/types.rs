//! Policy rule types. Administrators write these; the engine only reads
//! immutable snapshots of them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;

pub const DEFAULT_PRIORITY: u32 = 100;

/// What a matched policy dictates for the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Allow,
    Stepup,
    Deny,
}

impl PolicyAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Stepup => "stepup",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named decision rule.
///
/// Policies with a lower `priority` are evaluated first; equal priorities
/// keep their configured order. All conditions on a policy must hold for it
/// to match, and a policy with no conditions matches every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub action: PolicyAction,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Policy {
    #[must_use]
    pub fn new(name: impl Into<String>, action: PolicyAction) -> Self {
        Self {
            name: name.into(),
            description: None,
            conditions: Vec::new(),
            action,
            priority: DEFAULT_PRIORITY,
            enabled: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn default_true() -> bool {
    true
}

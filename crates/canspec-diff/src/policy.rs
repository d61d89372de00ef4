//! Severity policy and diff configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::subsystem::SubsystemMap;
use crate::types::{ChangeCategory, Severity};

/// Per-category severity overrides on top of the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityPolicy {
    overrides: BTreeMap<ChangeCategory, Severity>,
}

impl SeverityPolicy {
    /// Builder: override one category.
    pub fn with_override(mut self, category: ChangeCategory, severity: Severity) -> Self {
        self.overrides.insert(category, severity);
        self
    }

    /// Severity for `category`: the override if one is set, else the default.
    pub fn severity_for(&self, category: ChangeCategory) -> Severity {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_severity())
    }

    pub fn overrides(&self) -> impl Iterator<Item = (ChangeCategory, Severity)> + '_ {
        self.overrides.iter().map(|(c, s)| (*c, *s))
    }
}

/// Inputs to the diff engine besides the two specifications.
///
/// Deserializes from the `[subsystems]` and `[severity]` tables plus an
/// optional top-level `expand_messages` key; other tables are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub subsystems: SubsystemMap,
    #[serde(default)]
    pub severity: SeverityPolicy,
    /// Also emit one signal diff per signal of an added or removed message.
    #[serde(default)]
    pub expand_messages: bool,
}

impl DiffConfig {
    pub fn new(subsystems: SubsystemMap) -> Self {
        Self {
            subsystems,
            severity: SeverityPolicy::default(),
            expand_messages: false,
        }
    }

    pub fn with_severity(mut self, severity: SeverityPolicy) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_expanded_messages(mut self) -> Self {
        self.expand_messages = true;
        self
    }
}

//! Validation configuration and the context handed to rules.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::finding::Severity;
use crate::rdf::ResourceDescription;
use crate::spec_version::Revision;

/// Configuration for validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Rules to disable by ID
    #[serde(default)]
    pub disabled_rules: HashSet<String>,

    /// Severity overrides by rule ID
    #[serde(default)]
    pub severity_overrides: HashMap<String, Severity>,

    /// Treat warnings as errors
    #[serde(default)]
    pub strict: bool,

    /// Stop after this many errors
    #[serde(default)]
    pub max_errors: Option<usize>,
}

impl ValidationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    #[must_use]
    pub const fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = Some(max);
        self
    }

    #[must_use]
    pub fn disable_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.disabled_rules.insert(rule_id.into());
        self
    }

    #[must_use]
    pub fn override_severity(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.severity_overrides.insert(rule_id.into(), severity);
        self
    }

    #[must_use]
    pub fn is_rule_disabled(&self, rule_id: &str) -> bool {
        self.disabled_rules.contains(rule_id)
    }

    /// Severity after overrides, with strict mode promoting warnings.
    #[must_use]
    pub fn effective_severity(&self, rule_id: &str, default: Severity) -> Severity {
        let severity = self
            .severity_overrides
            .get(rule_id)
            .copied()
            .unwrap_or(default);

        if self.strict && severity == Severity::Warning {
            Severity::Error
        } else {
            severity
        }
    }
}

/// Context provided to validation rules
pub struct ValidationContext<'a> {
    pub description: &'a ResourceDescription,
    pub revision: Revision,
    pub config: &'a ValidationConfig,
}

impl<'a> ValidationContext<'a> {
    #[must_use]
    pub fn new(description: &'a ResourceDescription, config: &'a ValidationConfig) -> Self {
        Self {
            description,
            revision: description.revision(),
            config,
        }
    }

    #[must_use]
    pub fn is_v04(&self) -> bool {
        self.revision == Revision::V0_4
    }
}

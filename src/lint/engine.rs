//! Validation engine running rule groups against a description.

use serde::Serialize;
use tracing::debug;

use super::config::{ValidationConfig, ValidationContext};
use super::finding::{Finding, RuleCategory, Severity};
use super::rule::BoxedRule;
use crate::rdf::ResourceDescription;

/// Outcome of validating one description.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Findings in group order, then rule registration order.
    pub findings: Vec<Finding>,
    /// Whether validation stopped early due to `max_errors`
    pub truncated: bool,
    /// No error findings
    pub passed: bool,
}

impl ValidationReport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            findings: Vec::new(),
            truncated: false,
            passed: true,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn by_category(&self, category: RuleCategory) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.category == category)
    }

    pub fn by_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.rule_id == rule_id)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.findings.len()
    }
}

/// The validation engine that manages and runs rules
pub struct ValidationEngine {
    rules: Vec<BoxedRule>,
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Engine with no rules registered.
    #[must_use]
    pub const fn new(config: ValidationConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// Engine with every built-in rule registered.
    #[must_use]
    pub fn standard(config: ValidationConfig) -> Self {
        let mut engine = Self::new(config);
        for rule in super::rules::all_rules() {
            engine.register(rule);
        }
        engine
    }

    pub fn register(&mut self, rule: BoxedRule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn with_rule(mut self, rule: BoxedRule) -> Self {
        self.register(rule);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[BoxedRule] {
        &self.rules
    }

    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ValidationConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn validate(&self, description: &ResourceDescription) -> ValidationReport {
        let ctx = ValidationContext::new(description, &self.config);
        self.validate_with_context(&ctx)
    }

    /// Run every enabled rule that applies to the description's revision.
    /// Groups run in [`RuleCategory`] order; within a group rules run in
    /// registration order.
    #[must_use]
    pub fn validate_with_context(&self, ctx: &ValidationContext<'_>) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut error_count = 0;

        for category in RuleCategory::ALL {
            for rule in self.rules.iter().filter(|r| r.category() == category) {
                if self.config.is_rule_disabled(rule.id()) || !rule.applies_to(ctx.revision) {
                    continue;
                }

                for mut finding in rule.validate(ctx) {
                    finding.category = category;
                    finding.severity = self
                        .config
                        .effective_severity(&finding.rule_id, finding.severity);

                    if finding.severity == Severity::Error {
                        error_count += 1;
                    }
                    report.findings.push(finding);

                    if let Some(max) = self.config.max_errors {
                        if error_count >= max {
                            report.truncated = true;
                            report.passed = false;
                            return report;
                        }
                    }
                }
            }
        }

        debug!(
            revision = %ctx.revision,
            errors = error_count,
            findings = report.findings.len(),
            "validation finished"
        );
        report.passed = error_count == 0;
        report
    }

    /// List all registered rules in execution order.
    #[must_use]
    pub fn list_rules(&self) -> Vec<RuleInfo> {
        let mut infos: Vec<RuleInfo> = self
            .rules
            .iter()
            .map(|r| RuleInfo {
                id: r.id().to_string(),
                name: r.name().to_string(),
                description: r.description().to_string(),
                category: r.category(),
                default_severity: r.default_severity(),
                disabled: self.config.is_rule_disabled(r.id()),
            })
            .collect();
        infos.sort_by_key(|info| info.category);
        infos
    }
}

/// Information about a registered rule
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: RuleCategory,
    pub default_severity: Severity,
    pub disabled: bool,
}

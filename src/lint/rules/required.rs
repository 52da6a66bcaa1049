//! Required-field rules.
//!
//! These run first: later groups assume that the basic shape of a
//! description is in place and would only repeat the same problem.

use crate::impl_rule;
use crate::lint::config::ValidationContext;
use crate::lint::finding::{Finding, RuleCategory, Severity};
use crate::lint::rule::ValidationRule;
use crate::rdf::Slot;
use crate::spec_version::{OLDEST_FORMAT_VERSION, Revision};

use super::tensors;

impl_rule!(
    DeclaredFormatVersionRule,
    id: "declared-format-version",
    name: "Declared Format Version",
    description: "Descriptions should declare format_version instead of relying on the 0.4.0 default",
    category: RuleCategory::Required,
    severity: Severity::Warning,
    validate: |ctx| {
        if ctx.description.format_version_declared {
            vec![]
        } else {
            vec![Finding::warning(
                "declared-format-version",
                format!("format_version is missing; read as {OLDEST_FORMAT_VERSION}"),
            )
            .at("format_version")
            .with_suggestion("declare format_version explicitly")]
        }
    }
);

/// Required top-level fields. `type` and `name` always; models also need
/// `description`, `authors`, `inputs`, `outputs` and `weights`.
pub struct RequiredFieldsRule;

impl RequiredFieldsRule {
    fn check<T>(&self, field: &str, slot: &Slot<T>, is_empty: impl Fn(&T) -> bool) -> Option<Finding> {
        match slot {
            Slot::Absent => Some(
                Finding::error(self.id(), format!("missing required field '{field}'")).at(field),
            ),
            Slot::Value(value) if is_empty(value) => {
                Some(Finding::error(self.id(), format!("'{field}' must not be empty")).at(field))
            }
            // mistyped values are reported by `mistyped-field`
            _ => None,
        }
    }
}

impl ValidationRule for RequiredFieldsRule {
    fn id(&self) -> &'static str {
        "required-fields"
    }

    fn name(&self) -> &'static str {
        "Required Fields"
    }

    fn description(&self) -> &'static str {
        "Required fields must be present and non-empty"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Required
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let rd = ctx.description;
        let mut findings = Vec::new();
        let blank = |s: &String| s.trim().is_empty();

        findings.extend(
            self.check("type", &rd.kind, blank)
                .map(|f| f.with_suggestion("add 'type: model' or another resource type")),
        );
        findings.extend(self.check("name", &rd.name, blank));

        if rd.is_model() {
            findings.extend(self.check("description", &rd.description, blank));
            findings.extend(self.check("authors", &rd.authors, Vec::is_empty));
            findings.extend(self.check("inputs", &rd.inputs, Vec::is_empty));
            findings.extend(self.check("outputs", &rd.outputs, Vec::is_empty));
            findings.extend(self.check("weights", &rd.weights, |w| w.is_empty()));
        }

        findings
    }
}

/// Every tensor needs its identifier: `name` in 0.4, `id` in 0.5.
pub struct TensorIdentityRule;

impl ValidationRule for TensorIdentityRule {
    fn id(&self) -> &'static str {
        "tensor-identity"
    }

    fn name(&self) -> &'static str {
        "Tensor Identity"
    }

    fn description(&self) -> &'static str {
        "Each input and output tensor must carry its identifier"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Required
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let (key, other) = match ctx.revision {
            Revision::V0_4 => ("name", "id"),
            Revision::V0_5 => ("id", "name"),
        };

        let mut findings = Vec::new();
        for (path, tensor, _) in tensors(ctx.description) {
            let present = tensor
                .identity(ctx.revision)
                .is_some_and(|id| !id.trim().is_empty());
            if present {
                continue;
            }
            let mut finding = Finding::error(
                self.id(),
                format!("tensor has no '{key}' (required by format {})", ctx.revision),
            )
            .at(format!("{path}.{key}"));
            let misplaced = match ctx.revision {
                Revision::V0_4 => tensor.id.is_some(),
                Revision::V0_5 => tensor.name.is_some(),
            };
            if misplaced {
                finding = finding.with_suggestion(format!("rename '{other}' to '{key}'"));
            }
            findings.push(finding);
        }
        findings
    }
}

pub fn required_rules() -> Vec<crate::lint::rule::BoxedRule> {
    vec![
        Box::new(DeclaredFormatVersionRule),
        Box::new(RequiredFieldsRule),
        Box::new(TensorIdentityRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::config::ValidationConfig;
    use crate::lint::rules::tests::parse;

    fn run(rule: &dyn ValidationRule, yaml: &str) -> Vec<Finding> {
        let rd = parse(yaml);
        let config = ValidationConfig::new();
        rule.validate(&ValidationContext::new(&rd, &config))
    }

    #[test]
    fn undeclared_format_version_warns() {
        let findings = run(&DeclaredFormatVersionRule, "type: dataset\nname: d\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);

        let findings = run(
            &DeclaredFormatVersionRule,
            "format_version: 0.4.10\ntype: dataset\nname: d\n",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn missing_type_and_name() {
        let findings = run(&RequiredFieldsRule, "format_version: 0.5.3\n");
        let fields: Vec<_> = findings.iter().filter_map(|f| f.field.as_deref()).collect();
        assert_eq!(fields, ["type", "name"]);
        assert!(findings[0].suggestion.is_some());
    }

    #[test]
    fn models_need_more() {
        let findings = run(
            &RequiredFieldsRule,
            "format_version: 0.5.3\ntype: model\nname: m\nauthors: []\n",
        );
        let fields: Vec<_> = findings.iter().filter_map(|f| f.field.as_deref()).collect();
        assert_eq!(fields, ["description", "authors", "inputs", "outputs", "weights"]);
        assert!(findings[1].message.contains("must not be empty"));
    }

    #[test]
    fn mistyped_counts_as_present() {
        let findings = run(&RequiredFieldsRule, "format_version: 0.5.3\ntype: dataset\nname: [1]\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn tensor_identity_by_revision() {
        let v04 = "format_version: 0.4.10\ninputs:\n  - name: raw\n  - axes: bcyx\n";
        let findings = run(&TensorIdentityRule, v04);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field.as_deref(), Some("inputs[1].name"));

        let v05 = "format_version: 0.5.3\ninputs:\n  - name: raw\n";
        let findings = run(&TensorIdentityRule, v05);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field.as_deref(), Some("inputs[0].id"));
        assert_eq!(findings[0].suggestion.as_deref(), Some("rename 'name' to 'id'"));
    }
}

//! Field type and vocabulary rules.

use std::path::Path;

use crate::impl_rule;
use crate::lint::config::ValidationContext;
use crate::lint::finding::{Finding, RuleCategory, Severity};
use crate::lint::rule::{BoxedRule, ValidationRule};
use crate::rdf::{
    Architecture, Attachments, FileReference, KNOWN_FIELDS, PASSTHROUGH_FIELDS, WEIGHTS_FORMATS,
};
use crate::spec_version::Revision;

use super::tensors;

/// Resource types a description may declare.
pub const RESOURCE_TYPES: &[&str] = &[
    "application",
    "collection",
    "dataset",
    "generic",
    "model",
    "notebook",
];

impl_rule!(
    MistypedFieldRule,
    id: "mistyped-field",
    name: "Mistyped Field",
    description: "Known fields must hold values of the expected type",
    category: RuleCategory::Types,
    severity: Severity::Error,
    validate: |ctx| {
        ctx.description
            .mistyped_fields()
            .into_iter()
            .map(|(key, expected, reason)| {
                Finding::error("mistyped-field", format!("expected {expected}: {reason}")).at(key)
            })
            .collect()
    }
);

impl_rule!(
    KnownTypeRule,
    id: "known-type",
    name: "Known Resource Type",
    description: "The 'type' field must name a known resource type",
    category: RuleCategory::Types,
    severity: Severity::Error,
    validate: |ctx| {
        match ctx.description.resource_type() {
            Some(kind) if !RESOURCE_TYPES.contains(&kind) && !kind.trim().is_empty() => {
                vec![Finding::error("known-type", format!("unknown resource type '{kind}'"))
                    .at("type")
                    .with_suggestion(format!("use one of: {}", RESOURCE_TYPES.join(", ")))]
            }
            _ => vec![],
        }
    }
);

/// Top-level keys outside the model are kept verbatim but flagged.
pub struct UnrecognizedFieldRule;

impl ValidationRule for UnrecognizedFieldRule {
    fn id(&self) -> &'static str {
        "unrecognized-field"
    }

    fn name(&self) -> &'static str {
        "Unrecognized Field"
    }

    fn description(&self) -> &'static str {
        "Top-level keys the schema does not define are preserved and reported"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Types
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        ctx.description
            .unrecognized
            .keys()
            .filter(|key| !PASSTHROUGH_FIELDS.contains(&key.as_str()))
            .map(|key| {
                let mut finding = Finding::warning(self.id(), "unrecognized field; kept as-is").at(key);
                if let Some(close) = closest_known(key) {
                    finding = finding.with_suggestion(format!("did you mean '{close}'?"));
                }
                finding
            })
            .collect()
    }
}

/// A known field whose spelling differs from `key` only by case or
/// separators.
fn closest_known(key: &str) -> Option<&'static str> {
    let squash = |s: &str| {
        s.chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };
    let wanted = squash(key);
    KNOWN_FIELDS.iter().copied().find(|known| squash(known) == wanted)
}

/// 0.4 layouts inside a 0.5 description.
pub struct DeprecatedFieldRule;

impl ValidationRule for DeprecatedFieldRule {
    fn id(&self) -> &'static str {
        "deprecated-field"
    }

    fn name(&self) -> &'static str {
        "Deprecated Field"
    }

    fn description(&self) -> &'static str {
        "Format 0.5 descriptions should not use fields replaced since 0.4"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Types
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn applies_to(&self, revision: Revision) -> bool {
        revision == Revision::V0_5
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let rd = ctx.description;
        let mut findings = Vec::new();

        for (key, absent, replacement) in [
            ("test_inputs", rd.test_inputs.is_absent(), "inputs[i].test_tensor"),
            ("test_outputs", rd.test_outputs.is_absent(), "outputs[i].test_tensor"),
            ("sample_inputs", rd.sample_inputs.is_absent(), "inputs[i].sample_tensor"),
            ("sample_outputs", rd.sample_outputs.is_absent(), "outputs[i].sample_tensor"),
        ] {
            if !absent {
                findings.push(
                    Finding::warning(self.id(), format!("'{key}' was replaced in format 0.5"))
                        .at(key)
                        .with_suggestion(format!("use {replacement}")),
                );
            }
        }

        if matches!(rd.attachments.value(), Some(Attachments::Legacy(_))) {
            findings.push(
                Finding::warning(self.id(), "'attachments.files' was replaced in format 0.5")
                    .at("attachments")
                    .with_suggestion("list attachments as file descriptions"),
            );
        }

        for (path, tensor, _) in tensors(rd) {
            if tensor.name.is_some() && tensor.id.is_some() {
                findings.push(
                    Finding::warning(self.id(), "tensor 'name' was replaced by 'id' in format 0.5")
                        .at(format!("{path}.name")),
                );
            }
        }

        if let Some(weights) = rd.weights.value() {
            for (format, entry) in weights {
                if matches!(entry.architecture, Some(Architecture::Callable(_))) {
                    findings.push(
                        Finding::warning(self.id(), "architecture given as a 'file.py:Callable' string")
                            .at(format!("weights.{format}.architecture"))
                            .with_suggestion("use an architecture object with 'source' and 'callable'"),
                    );
                }
            }
        }

        findings
    }
}

impl_rule!(
    WeightsFormatRule,
    id: "weights-format",
    name: "Weights Format",
    description: "Weights entries must use a known format key; pytorch_state_dict needs an architecture",
    category: RuleCategory::Types,
    severity: Severity::Error,
    validate: |ctx| {
        let Some(weights) = ctx.description.weights.value() else {
            return vec![];
        };
        let mut findings = Vec::new();
        for (format, entry) in weights {
            if !WEIGHTS_FORMATS.contains(&format.as_str()) {
                findings.push(
                    Finding::error("weights-format", format!("unknown weights format '{format}'"))
                        .at(format!("weights.{format}"))
                        .with_suggestion(format!("use one of: {}", WEIGHTS_FORMATS.join(", "))),
                );
            } else if format == "pytorch_state_dict" && entry.architecture.is_none() {
                findings.push(
                    Finding::error("weights-format", "pytorch_state_dict weights need an architecture")
                        .at(format!("weights.{format}.architecture")),
                );
            }
        }
        findings
    }
);

/// File references must be usable: non-empty, with a fetchable scheme, and
/// relative paths staying inside the description root.
pub struct FileReferenceRule;

impl ValidationRule for FileReferenceRule {
    fn id(&self) -> &'static str {
        "file-reference"
    }

    fn name(&self) -> &'static str {
        "File Reference"
    }

    fn description(&self) -> &'static str {
        "File references must be non-empty and stay inside the description root"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Types
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for site in ctx.description.file_references() {
            let finding = match &site.reference {
                FileReference::Url(url) if !matches!(url.scheme(), "http" | "https" | "file") => Some(
                    Finding::error(self.id(), format!("unsupported URL scheme '{}'", url.scheme())),
                ),
                FileReference::Url(_) => None,
                FileReference::Path(path) if path.trim().is_empty() => {
                    Some(Finding::error(self.id(), "empty file reference"))
                }
                FileReference::Path(path) if Path::new(path).is_absolute() => Some(
                    Finding::warning(self.id(), format!("absolute path '{path}' is not portable"))
                        .with_suggestion("reference files relative to the description"),
                ),
                FileReference::Path(path) if escapes_root(path) => Some(Finding::warning(
                    self.id(),
                    format!("'{path}' points outside the description root"),
                )),
                FileReference::Path(_) => None,
            };
            findings.extend(finding.map(|f| f.at(site.field)));
        }
        findings
    }
}

/// Whether a relative path climbs above its starting directory.
pub(crate) fn escapes_root(path: &str) -> bool {
    let mut depth: i64 = 0;
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

pub fn type_rules() -> Vec<BoxedRule> {
    vec![
        Box::new(MistypedFieldRule),
        Box::new(KnownTypeRule),
        Box::new(UnrecognizedFieldRule),
        Box::new(DeprecatedFieldRule),
        Box::new(WeightsFormatRule),
        Box::new(FileReferenceRule),
    ]
}

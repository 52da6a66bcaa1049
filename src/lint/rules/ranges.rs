//! Numeric range and string format rules.

use crate::lint::config::ValidationContext;
use crate::lint::finding::{Finding, RuleCategory, Severity};
use crate::lint::rule::{BoxedRule, ValidationRule};
use crate::rdf::{Architecture, Attachments, AxisSize, Axes, Shape};

use super::tensors;

/// Names longer than this draw a warning.
pub const NAME_SOFT_LIMIT: usize = 64;
/// Names longer than this are invalid.
pub const NAME_HARD_LIMIT: usize = 1024;

/// Shape and axis sizes must be positive; steps must not be negative.
pub struct ShapeRangeRule;

impl ShapeRangeRule {
    fn check_shape(&self, path: &str, shape: &Shape, findings: &mut Vec<Finding>) {
        let field = format!("{path}.shape");
        match shape {
            Shape::Explicit(dims) => {
                if let Some(bad) = dims.iter().find(|d| **d < 1) {
                    findings.push(
                        Finding::error(self.id(), format!("dimension {bad} must be at least 1")).at(field),
                    );
                }
            }
            Shape::Parameterized(param) => {
                if param.min.len() != param.step.len() {
                    findings.push(
                        Finding::error(
                            self.id(),
                            format!("min has {} entries but step has {}", param.min.len(), param.step.len()),
                        )
                        .at(field),
                    );
                } else if param.min.iter().any(|m| *m < 1) {
                    findings.push(Finding::error(self.id(), "min sizes must be at least 1").at(field));
                } else if param.step.iter().any(|s| *s < 0) {
                    findings.push(Finding::error(self.id(), "steps must not be negative").at(field));
                }
            }
            Shape::Implicit(implicit) => {
                if implicit.scale.len() != implicit.offset.len() {
                    findings.push(
                        Finding::error(
                            self.id(),
                            format!(
                                "scale has {} entries but offset has {}",
                                implicit.scale.len(),
                                implicit.offset.len()
                            ),
                        )
                        .at(field),
                    );
                }
            }
        }
    }

    fn check_axis_size(&self, field: String, size: &AxisSize, findings: &mut Vec<Finding>) {
        match size {
            AxisSize::Fixed(n) if *n < 1 => {
                findings.push(Finding::error(self.id(), format!("size {n} must be at least 1")).at(field));
            }
            AxisSize::Parameterized(param) if param.min < 1 => {
                findings.push(Finding::error(self.id(), "min size must be at least 1").at(field));
            }
            AxisSize::Parameterized(param) if param.step < 0 => {
                findings.push(Finding::error(self.id(), "step must not be negative").at(field));
            }
            _ => {}
        }
    }
}

impl ValidationRule for ShapeRangeRule {
    fn id(&self) -> &'static str {
        "shape-range"
    }

    fn name(&self) -> &'static str {
        "Shape Range"
    }

    fn description(&self) -> &'static str {
        "Tensor sizes must be positive and parameterized steps non-negative"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Ranges
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (path, tensor, _) in tensors(ctx.description) {
            if let Some(shape) = &tensor.shape {
                self.check_shape(&path, shape, &mut findings);
            }
            if let Some(Axes::List(axes)) = &tensor.axes {
                for (idx, axis) in axes.iter().enumerate() {
                    if let Some(size) = &axis.size {
                        self.check_axis_size(format!("{path}.axes[{idx}].size"), size, &mut findings);
                    }
                }
            }
        }
        findings
    }
}

/// `data_range` is a `[min, max]` pair with `min <= max`.
pub struct DataRangeRule;

impl ValidationRule for DataRangeRule {
    fn id(&self) -> &'static str {
        "data-range"
    }

    fn name(&self) -> &'static str {
        "Data Range"
    }

    fn description(&self) -> &'static str {
        "Tensor data ranges must be ordered [min, max] pairs"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Ranges
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (path, tensor, _) in tensors(ctx.description) {
            let Some(range) = &tensor.data_range else {
                continue;
            };
            let field = format!("{path}.data_range");
            match range.as_slice() {
                [min, max] if min > max => findings.push(
                    Finding::error(self.id(), format!("min {min} is greater than max {max}")).at(field),
                ),
                [_, _] => {}
                other => findings.push(
                    Finding::error(self.id(), format!("expected [min, max], found {} values", other.len()))
                        .at(field),
                ),
            }
        }
        findings
    }
}

/// Whether `digest` is a sha256 hex digest.
#[must_use]
pub fn is_sha256(digest: &str) -> bool {
    digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit())
}

/// Every declared `sha256` must be 64 hex characters.
pub struct Sha256FormatRule;

impl ValidationRule for Sha256FormatRule {
    fn id(&self) -> &'static str {
        "sha256-format"
    }

    fn name(&self) -> &'static str {
        "SHA-256 Format"
    }

    fn description(&self) -> &'static str {
        "Declared sha256 digests must be 64 hexadecimal characters"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Ranges
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let rd = ctx.description;
        let mut digests: Vec<(String, &str)> = Vec::new();

        if let Some(Attachments::Files(files)) = rd.attachments.value() {
            for (idx, file) in files.iter().enumerate() {
                if let Some(sha) = &file.sha256 {
                    digests.push((format!("attachments[{idx}].sha256"), sha.as_str()));
                }
            }
        }
        for (path, tensor, _) in tensors(rd) {
            for (key, file) in [("test_tensor", &tensor.test_tensor), ("sample_tensor", &tensor.sample_tensor)] {
                if let Some(sha) = file.as_ref().and_then(|f| f.sha256.as_deref()) {
                    digests.push((format!("{path}.{key}.sha256"), sha));
                }
            }
        }
        if let Some(weights) = rd.weights.value() {
            for (format, entry) in weights {
                if let Some(sha) = &entry.sha256 {
                    digests.push((format!("weights.{format}.sha256"), sha.as_str()));
                }
                if let Some(Architecture::Source(arch)) = &entry.architecture {
                    if let Some(sha) = &arch.sha256 {
                        digests.push((format!("weights.{format}.architecture.sha256"), sha.as_str()));
                    }
                }
            }
        }

        digests
            .into_iter()
            .filter(|(_, sha)| !is_sha256(sha))
            .map(|(field, sha)| {
                Finding::error(self.id(), format!("'{sha}' is not a sha256 hex digest")).at(field)
            })
            .collect()
    }
}

pub struct NameLengthRule;

impl ValidationRule for NameLengthRule {
    fn id(&self) -> &'static str {
        "name-length"
    }

    fn name(&self) -> &'static str {
        "Name Length"
    }

    fn description(&self) -> &'static str {
        "Resource names should be short"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Ranges
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let Some(name) = ctx.description.name.value() else {
            return vec![];
        };
        let length = name.chars().count();
        if length > NAME_HARD_LIMIT {
            vec![Finding::error(
                self.id(),
                format!("name has {length} characters; the limit is {NAME_HARD_LIMIT}"),
            )
            .at("name")]
        } else if length > NAME_SOFT_LIMIT {
            vec![Finding::warning(
                self.id(),
                format!("name has {length} characters; keep it within {NAME_SOFT_LIMIT}"),
            )
            .at("name")]
        } else {
            vec![]
        }
    }
}

pub fn range_rules() -> Vec<BoxedRule> {
    vec![
        Box::new(ShapeRangeRule),
        Box::new(DataRangeRule),
        Box::new(Sha256FormatRule),
        Box::new(NameLengthRule),
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

    fn fields(findings: &[Finding]) -> Vec<&str> {
        findings.iter().filter_map(|f| f.field.as_deref()).collect()
    }

    #[test]
    fn shape_ranges() {
        let yaml = r"format_version: 0.4.10
inputs:
  - name: a
    shape: [1, 0, 64]
  - name: b
    shape:
      min: [1, 16]
      step: [0]
  - name: c
    shape:
      min: [1, 16]
      step: [0, -8]
  - name: d
    shape: [1, 1, 64, 64]
";
        let findings = run(&ShapeRangeRule, yaml);
        assert_eq!(fields(&findings), ["inputs[0].shape", "inputs[1].shape", "inputs[2].shape"]);
    }

    #[test]
    fn axis_size_ranges() {
        let yaml = r"format_version: 0.5.3
inputs:
  - id: a
    axes:
      - type: space
        id: x
        size: 0
      - type: space
        id: y
        size:
          min: 16
          step: 8
";
        let findings = run(&ShapeRangeRule, yaml);
        assert_eq!(fields(&findings), ["inputs[0].axes[0].size"]);
    }

    #[test]
    fn data_ranges() {
        let yaml = "format_version: 0.4.10\ninputs:\n  - name: a\n    data_range: [1, 0]\n  - name: b\n    data_range: [0]\n  - name: c\n    data_range: [-.inf, .inf]\n";
        let findings = run(&DataRangeRule, yaml);
        assert_eq!(fields(&findings), ["inputs[0].data_range", "inputs[1].data_range"]);
    }

    #[test]
    fn sha256_digests() {
        let good = "a".repeat(64);
        let yaml = format!(
            "format_version: 0.4.10\nweights:\n  onnx:\n    source: w.onnx\n    sha256: {good}\n  torchscript:\n    source: w.pt\n    sha256: xyz\n"
        );
        let findings = run(&Sha256FormatRule, &yaml);
        assert_eq!(fields(&findings), ["weights.torchscript.sha256"]);
        assert!(is_sha256(&good));
        assert!(!is_sha256(&"g".repeat(64)));
    }

    #[test]
    fn name_lengths() {
        let long = format!("format_version: 0.5.3\nname: {}\n", "n".repeat(80));
        let findings = run(&NameLengthRule, &long);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);

        let huge = format!("format_version: 0.5.3\nname: {}\n", "n".repeat(2000));
        assert!(run(&NameLengthRule, &huge)[0].is_error());

        assert!(run(&NameLengthRule, "format_version: 0.5.3\nname: unet\n").is_empty());
    }
}

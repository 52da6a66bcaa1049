//! Cross-field consistency rules: tensor naming, test files, axes and
//! references between tensors.

use std::collections::{BTreeSet, HashMap};

use crate::lint::config::ValidationContext;
use crate::lint::finding::{Finding, RuleCategory, Severity};
use crate::lint::rule::{BoxedRule, ValidationRule};
use crate::rdf::{AXIS_TYPES, AxisDescr, AxisSize, Axes, Shape, TensorDescr};
use crate::spec_version::Revision;

use super::tensors;

/// Axis letters allowed in a 0.4 axes string.
pub const AXIS_LETTERS: &str = "bitczyx";

pub struct UniqueTensorNamesRule;

impl ValidationRule for UniqueTensorNamesRule {
    fn id(&self) -> &'static str {
        "unique-tensor-names"
    }

    fn name(&self) -> &'static str {
        "Unique Tensor Names"
    }

    fn description(&self) -> &'static str {
        "Tensor identifiers must be unique across inputs and outputs"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Consistency
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let mut seen: HashMap<&str, String> = HashMap::new();
        let mut findings = Vec::new();
        for (path, tensor, _) in tensors(ctx.description) {
            let Some(id) = tensor.identity(ctx.revision) else {
                continue;
            };
            if let Some(first) = seen.get(id) {
                findings.push(
                    Finding::error(self.id(), format!("tensor '{id}' is already declared at {first}"))
                        .at(path),
                );
            } else {
                seen.insert(id, path);
            }
        }
        findings
    }
}

/// Models ship test tensors for every input and output.
pub struct TestTensorsRule;

impl TestTensorsRule {
    fn check_v04(&self, ctx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        let rd = ctx.description;
        for (files, tensors, files_key, tensors_key) in [
            (&rd.test_inputs, &rd.inputs, "test_inputs", "inputs"),
            (&rd.test_outputs, &rd.outputs, "test_outputs", "outputs"),
        ] {
            let Some(declared) = tensors.value() else {
                continue;
            };
            if files.is_absent() {
                findings.push(
                    Finding::error(self.id(), format!("models need '{files_key}'")).at(files_key),
                );
            } else if let Some(files) = files.value() {
                if files.len() != declared.len() {
                    findings.push(
                        Finding::error(
                            self.id(),
                            format!(
                                "{} {files_key} for {} {tensors_key}",
                                files.len(),
                                declared.len()
                            ),
                        )
                        .at(files_key),
                    );
                }
            }
        }

        for (files, tensors, files_key, tensors_key) in [
            (&rd.sample_inputs, &rd.inputs, "sample_inputs", "inputs"),
            (&rd.sample_outputs, &rd.outputs, "sample_outputs", "outputs"),
        ] {
            let (Some(files), Some(declared)) = (files.value(), tensors.value()) else {
                continue;
            };
            if files.len() != declared.len() {
                findings.push(
                    Finding::warning(
                        self.id(),
                        format!("{} {files_key} for {} {tensors_key}", files.len(), declared.len()),
                    )
                    .at(files_key),
                );
            }
        }
    }

    fn check_v05(&self, ctx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        for (path, tensor, _) in tensors(ctx.description) {
            if tensor.test_tensor.is_none() {
                findings.push(
                    Finding::error(self.id(), "tensor has no test_tensor").at(format!("{path}.test_tensor")),
                );
            }
        }
    }
}

impl ValidationRule for TestTensorsRule {
    fn id(&self) -> &'static str {
        "test-tensors"
    }

    fn name(&self) -> &'static str {
        "Test Tensors"
    }

    fn description(&self) -> &'static str {
        "Models must provide one test tensor per input and output"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Consistency
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        if !ctx.description.is_model() {
            return vec![];
        }
        let mut findings = Vec::new();
        match ctx.revision {
            Revision::V0_4 => self.check_v04(ctx, &mut findings),
            Revision::V0_5 => self.check_v05(ctx, &mut findings),
        }
        findings
    }
}

/// References between tensors: implicit output shapes in 0.4, size
/// references in 0.5.
pub struct TensorReferencesRule;

impl TensorReferencesRule {
    fn check_v04(&self, ctx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        let all = tensors(ctx.description);
        let input_names: BTreeSet<&str> = all
            .iter()
            .filter(|(_, _, is_input)| *is_input)
            .filter_map(|(_, tensor, _)| tensor.name.as_deref())
            .collect();

        for (path, tensor, is_input) in &all {
            let Some(Shape::Implicit(shape)) = &tensor.shape else {
                continue;
            };
            let field = format!("{path}.shape.reference_tensor");
            if *is_input {
                findings.push(
                    Finding::error(self.id(), "input shapes cannot reference another tensor").at(field),
                );
            } else if !input_names.contains(shape.reference_tensor.as_str()) {
                findings.push(
                    Finding::error(
                        self.id(),
                        format!("'{}' is not an input tensor", shape.reference_tensor),
                    )
                    .at(field),
                );
            }
        }
    }

    fn check_v05(&self, ctx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        let all = tensors(ctx.description);
        let by_id: HashMap<&str, &TensorDescr> = all
            .iter()
            .filter_map(|(_, tensor, _)| tensor.id.as_deref().map(|id| (id, *tensor)))
            .collect();

        for (path, tensor, _) in &all {
            let Some(Axes::List(axes)) = &tensor.axes else {
                continue;
            };
            for (idx, axis) in axes.iter().enumerate() {
                let Some(AxisSize::Reference(reference)) = &axis.size else {
                    continue;
                };
                let field = format!("{path}.axes[{idx}].size");
                let Some(target) = by_id.get(reference.tensor_id.as_str()) else {
                    findings.push(
                        Finding::error(
                            self.id(),
                            format!("size references unknown tensor '{}'", reference.tensor_id),
                        )
                        .at(field),
                    );
                    continue;
                };
                let has_axis = match &target.axes {
                    Some(Axes::List(target_axes)) => target_axes
                        .iter()
                        .any(|a| a.effective_id() == Some(reference.axis_id.as_str())),
                    _ => false,
                };
                if !has_axis {
                    findings.push(
                        Finding::error(
                            self.id(),
                            format!(
                                "tensor '{}' has no axis '{}'",
                                reference.tensor_id, reference.axis_id
                            ),
                        )
                        .at(field),
                    );
                }
            }
        }
    }
}

impl ValidationRule for TensorReferencesRule {
    fn id(&self) -> &'static str {
        "tensor-references"
    }

    fn name(&self) -> &'static str {
        "Tensor References"
    }

    fn description(&self) -> &'static str {
        "Shapes and axis sizes may only reference tensors that exist"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Consistency
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        match ctx.revision {
            Revision::V0_4 => self.check_v04(ctx, &mut findings),
            Revision::V0_5 => self.check_v05(ctx, &mut findings),
        }
        findings
    }
}

/// Axes declarations: letter strings in 0.4, axis objects in 0.5.
pub struct AxesRule;

impl AxesRule {
    fn check_letters(&self, path: &str, letters: &str, tensor: &TensorDescr, findings: &mut Vec<Finding>) {
        let field = format!("{path}.axes");
        let mut seen = BTreeSet::new();
        for letter in letters.chars() {
            if !AXIS_LETTERS.contains(letter) {
                findings.push(
                    Finding::error(self.id(), format!("unknown axis '{letter}'"))
                        .at(&field)
                        .with_suggestion(format!("use letters from '{AXIS_LETTERS}'")),
                );
            } else if !seen.insert(letter) {
                findings.push(Finding::error(self.id(), format!("duplicate axis '{letter}'")).at(&field));
            }
        }
        if let Some(shape) = &tensor.shape {
            let rank = letters.chars().count();
            if shape.rank() != rank {
                findings.push(
                    Finding::error(
                        self.id(),
                        format!("shape has {} dimensions but axes '{letters}' has {rank}", shape.rank()),
                    )
                    .at(format!("{path}.shape")),
                );
            }
        }
    }

    fn check_objects(&self, path: &str, axes: &[AxisDescr], findings: &mut Vec<Finding>) {
        if axes.is_empty() {
            findings.push(Finding::error(self.id(), "tensor declares no axes").at(format!("{path}.axes")));
        }
        let mut seen = BTreeSet::new();
        for (idx, axis) in axes.iter().enumerate() {
            let field = format!("{path}.axes[{idx}]");
            if !AXIS_TYPES.contains(&axis.kind.as_str()) {
                findings.push(
                    Finding::error(self.id(), format!("unknown axis type '{}'", axis.kind))
                        .at(format!("{field}.type"))
                        .with_suggestion(format!("use one of: {}", AXIS_TYPES.join(", "))),
                );
                continue;
            }
            match axis.effective_id() {
                None => findings.push(
                    Finding::error(self.id(), format!("{} axes need an id", axis.kind)).at(format!("{field}.id")),
                ),
                Some(id) if !seen.insert(id) => findings.push(
                    Finding::error(self.id(), format!("duplicate axis id '{id}'")).at(format!("{field}.id")),
                ),
                Some(_) => {}
            }
        }
    }
}

impl ValidationRule for AxesRule {
    fn id(&self) -> &'static str {
        "axes"
    }

    fn name(&self) -> &'static str {
        "Axes"
    }

    fn description(&self) -> &'static str {
        "Tensor axes must be well formed for the format revision and agree with the shape"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Consistency
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (path, tensor, _) in tensors(ctx.description) {
            match (&tensor.axes, ctx.revision) {
                (None, _) => findings.push(
                    Finding::error(self.id(), "tensor has no axes").at(format!("{path}.axes")),
                ),
                (Some(Axes::Letters(letters)), Revision::V0_4) => {
                    self.check_letters(&path, letters, tensor, &mut findings);
                }
                (Some(Axes::List(axes)), Revision::V0_5) => {
                    self.check_objects(&path, axes, &mut findings);
                }
                (Some(Axes::List(_)), Revision::V0_4) => findings.push(
                    Finding::error(self.id(), "format 0.4 declares axes as a string such as 'bcyx'")
                        .at(format!("{path}.axes")),
                ),
                (Some(Axes::Letters(_)), Revision::V0_5) => findings.push(
                    Finding::error(self.id(), "format 0.5 declares axes as a list of axis objects")
                        .at(format!("{path}.axes")),
                ),
            }
        }
        findings
    }
}

pub fn consistency_rules() -> Vec<BoxedRule> {
    vec![
        Box::new(UniqueTensorNamesRule),
        Box::new(TestTensorsRule),
        Box::new(TensorReferencesRule),
        Box::new(AxesRule),
    ]
}

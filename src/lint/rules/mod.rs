//! Built-in validation rules, one module per group:
//!
//! - **Required** (`required`): presence of required fields
//! - **Types** (`types`): field types, vocabularies and file references
//! - **Consistency** (`consistency`): tensors, axes and test files agree
//! - **Ranges** (`ranges`): numeric ranges and digest formats
//!
//! # Usage
//!
//! ```
//! use bioimageio_core::lint::rules::all_rules;
//! use bioimageio_core::lint::ValidationEngine;
//!
//! let mut engine = ValidationEngine::with_defaults();
//! for rule in all_rules() {
//!     engine.register(rule);
//! }
//! ```

pub mod consistency;
pub mod ranges;
pub mod required;
pub mod types;

use crate::lint::rule::BoxedRule;
use crate::rdf::{ResourceDescription, TensorDescr};

pub use consistency::{AxesRule, TensorReferencesRule, TestTensorsRule, UniqueTensorNamesRule};
pub use ranges::{DataRangeRule, NameLengthRule, Sha256FormatRule, ShapeRangeRule, is_sha256};
pub use required::{DeclaredFormatVersionRule, RequiredFieldsRule, TensorIdentityRule};
pub use types::{
    DeprecatedFieldRule, FileReferenceRule, KnownTypeRule, MistypedFieldRule, RESOURCE_TYPES,
    UnrecognizedFieldRule, WeightsFormatRule,
};

pub fn required_rules() -> Vec<BoxedRule> {
    required::required_rules()
}

pub fn type_rules() -> Vec<BoxedRule> {
    types::type_rules()
}

pub fn consistency_rules() -> Vec<BoxedRule> {
    consistency::consistency_rules()
}

pub fn range_rules() -> Vec<BoxedRule> {
    ranges::range_rules()
}

/// All built-in rules in group order.
pub fn all_rules() -> Vec<BoxedRule> {
    let mut rules = required_rules();
    rules.extend(type_rules());
    rules.extend(consistency_rules());
    rules.extend(range_rules());
    rules
}

/// `(field path, tensor, is_input)` for every input then every output.
pub(crate) fn tensors(rd: &ResourceDescription) -> Vec<(String, &TensorDescr, bool)> {
    let inputs = rd
        .inputs
        .value()
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(idx, tensor)| (format!("inputs[{idx}]"), tensor, true));
    let outputs = rd
        .outputs
        .value()
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(idx, tensor)| (format!("outputs[{idx}]"), tensor, false));
    inputs.chain(outputs).collect()
}

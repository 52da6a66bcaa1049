//! Validation rule trait.

use super::config::ValidationContext;
use super::finding::{Finding, RuleCategory, Severity};
use crate::spec_version::Revision;

/// A validation rule that checks descriptions for issues.
///
/// Rules are stateless; everything they need comes through the
/// `ValidationContext`.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "required-fields")
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Detailed description of what this rule checks
    fn description(&self) -> &str;

    /// Group this rule runs in
    fn category(&self) -> RuleCategory;

    /// Default severity level
    fn default_severity(&self) -> Severity;

    /// Whether this rule runs for descriptions of `revision`.
    fn applies_to(&self, _revision: Revision) -> bool {
        true
    }

    /// Run the validation check
    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Finding>;
}

/// A boxed validation rule for dynamic dispatch
pub type BoxedRule = Box<dyn ValidationRule>;

/// Helper macro for rules that need no state or revision filter.
#[macro_export]
macro_rules! impl_rule {
    (
        $struct_name:ident,
        id: $id:expr,
        name: $name:expr,
        description: $desc:expr,
        category: $cat:expr,
        severity: $sev:expr,
        validate: |$ctx:ident| $validate_body:expr
    ) => {
        pub struct $struct_name;

        impl $crate::lint::rule::ValidationRule for $struct_name {
            fn id(&self) -> &str {
                $id
            }

            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn category(&self) -> $crate::lint::finding::RuleCategory {
                $cat
            }

            fn default_severity(&self) -> $crate::lint::finding::Severity {
                $sev
            }

            fn validate(
                &self,
                $ctx: &$crate::lint::config::ValidationContext<'_>,
            ) -> Vec<$crate::lint::finding::Finding> {
                $validate_body
            }
        }
    };
}

pub use impl_rule;

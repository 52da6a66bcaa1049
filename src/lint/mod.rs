//! Validation of resource descriptions.
//!
//! - `ValidationRule` trait for individual checks
//! - `ValidationEngine` runs rules group by group (required, types,
//!   consistency, ranges), skipping rules that do not apply to the
//!   description's format revision
//! - `Finding` reports a problem with its field path and severity
//! - `ValidationConfig` disables rules, overrides severities, or turns
//!   warnings into errors
//!
//! # Example
//!
//! ```
//! use bioimageio_core::lint::{ValidationConfig, ValidationEngine};
//! use bioimageio_core::rdf::DescriptionParser;
//! use bioimageio_core::source::BaseLocation;
//!
//! let rd = DescriptionParser::default()
//!     .parse(
//!         b"format_version: 0.5.3\ntype: dataset\nname: cells\n",
//!         BaseLocation::Directory("/data".into()),
//!         "<doc>",
//!     )
//!     .unwrap();
//!
//! let report = ValidationEngine::standard(ValidationConfig::new()).validate(&rd);
//! assert!(report.passed);
//! ```

pub mod config;
pub mod engine;
pub mod finding;
pub mod rule;
pub mod rules;

pub use config::{ValidationConfig, ValidationContext};
pub use engine::{RuleInfo, ValidationEngine, ValidationReport};
pub use finding::{Finding, RuleCategory, Severity};
pub use rule::{BoxedRule, ValidationRule};

pub use rules::{all_rules, consistency_rules, range_rules, required_rules, type_rules};

//! Self-contained zip packages of a description and its files.
//!
//! Every referenced file is copied under a role directory (`weights/`,
//! `test_tensors/`, `covers/`, ...) and the description's references are
//! rewritten to the member names. The description is always the first
//! member, `rdf.yaml`.

pub mod builder;
pub mod manifest;

pub use builder::{PackageBuilder, PackageOptions};
pub use manifest::{ManifestEntry, PackageManifest};

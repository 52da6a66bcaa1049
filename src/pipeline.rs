//! Resolve, parse, validate, write and package in one place.
//!
//! A [`Pipeline`] owns the resolver, parser and validation engine built from a
//! [`Config`]. The free functions at the bottom of this module build a
//! default pipeline per call.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{RdfError, Result};
use crate::lint::{ValidationEngine, ValidationReport};
use crate::package::{PackageBuilder, PackageManifest, PackageOptions};
use crate::rdf::{DescriptionParser, ResourceDescription};
use crate::source::{ResolvedSource, SourceRef, SourceResolver};
use crate::writer::DescriptionWriter;

pub use crate::spec_version::max_supported_format_version;

pub struct Pipeline {
    resolver: SourceResolver,
    parser: DescriptionParser,
    engine: ValidationEngine,
    writer: DescriptionWriter,
    package: PackageOptions,
}

impl Pipeline {
    #[must_use]
    pub fn new(resolver: SourceResolver, parser: DescriptionParser, engine: ValidationEngine) -> Self {
        Self {
            resolver,
            parser,
            engine,
            writer: DescriptionWriter::new(),
            package: PackageOptions::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline = Self::new(
            SourceResolver::from_config(config)?,
            DescriptionParser::new(config.version_policy()?),
            ValidationEngine::standard(config.validation.to_validation_config()),
        )
        .with_package_options(PackageOptions::from(&config.package));
        Ok(pipeline)
    }

    #[must_use]
    pub fn with_package_options(mut self, options: PackageOptions) -> Self {
        self.package = options;
        self
    }

    #[must_use]
    pub const fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn parser(&self) -> &DescriptionParser {
        &self.parser
    }

    #[must_use]
    pub const fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    #[must_use]
    pub const fn package_options(&self) -> &PackageOptions {
        &self.package
    }

    pub fn resolve_source(&self, source: &SourceRef) -> Result<ResolvedSource> {
        self.resolver.resolve(source)
    }

    /// Resolve and parse without validating.
    pub fn read_description(&self, source: &SourceRef) -> Result<ResourceDescription> {
        let resolved = self.resolve_source(source)?;
        self.parser
            .parse(&resolved.content, resolved.root, &resolved.origin)
    }

    pub fn read_description_and_validate(
        &self,
        source: &SourceRef,
    ) -> Result<(ResourceDescription, ValidationReport)> {
        let description = self.read_description(source)?;
        let report = self.validate_description(&description);
        Ok((description, report))
    }

    /// Like [`Self::read_description_and_validate`], but a report with errors
    /// becomes [`RdfError::ValidationFailed`].
    pub fn load_description(&self, source: &SourceRef) -> Result<ResourceDescription> {
        let (description, report) = self.read_description_and_validate(source)?;
        if report.passed {
            return Ok(description);
        }
        let first = report
            .errors()
            .next()
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(source = %source, errors = report.error_count(), "description failed validation");
        Err(RdfError::ValidationFailed {
            errors: report.error_count(),
            first,
        })
    }

    #[must_use]
    pub fn validate_description(&self, description: &ResourceDescription) -> ValidationReport {
        let report = self.engine.validate(description);
        info!(
            format_version = %description.format_version,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validated description"
        );
        report
    }

    pub fn write_description(&self, description: &ResourceDescription, target: &Path) -> Result<PathBuf> {
        self.writer.write(description, target)
    }

    /// Package with this pipeline's configured options.
    pub fn write_package(&self, description: &ResourceDescription, target: &Path) -> Result<PackageManifest> {
        self.write_package_with(description, target, self.package.clone())
    }

    pub fn write_package_with(
        &self,
        description: &ResourceDescription,
        target: &Path,
        options: PackageOptions,
    ) -> Result<PackageManifest> {
        PackageBuilder::new(&self.resolver, &self.engine, options).build(description, target)
    }
}

fn default_pipeline() -> Result<Pipeline> {
    Pipeline::from_config(&Config::default())
}

pub fn resolve_source(source: impl Into<SourceRef>) -> Result<ResolvedSource> {
    default_pipeline()?.resolve_source(&source.into())
}

pub fn read_description(source: impl Into<SourceRef>) -> Result<ResourceDescription> {
    default_pipeline()?.read_description(&source.into())
}

pub fn read_description_and_validate(
    source: impl Into<SourceRef>,
) -> Result<(ResourceDescription, ValidationReport)> {
    default_pipeline()?.read_description_and_validate(&source.into())
}

pub fn load_description(source: impl Into<SourceRef>) -> Result<ResourceDescription> {
    default_pipeline()?.load_description(&source.into())
}

/// Validate with the built-in rules and default settings.
#[must_use]
pub fn validate_description(description: &ResourceDescription) -> ValidationReport {
    ValidationEngine::standard(crate::lint::ValidationConfig::new()).validate(description)
}

pub fn write_description(description: &ResourceDescription, target: impl AsRef<Path>) -> Result<PathBuf> {
    DescriptionWriter::new().write(description, target.as_ref())
}

pub fn write_package(description: &ResourceDescription, target: impl AsRef<Path>) -> Result<PackageManifest> {
    default_pipeline()?.write_package(description, target.as_ref())
}

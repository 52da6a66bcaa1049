//! Error types for description resolution, parsing, writing and packaging.

use std::fmt;
use std::path::PathBuf;

/// A file reference that could not be resolved while packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    /// Field path of the reference inside the description (e.g. `weights.onnx.source`)
    pub field: String,
    /// The reference as written in the description
    pub reference: String,
    /// Why it could not be opened
    pub reason: String,
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.reference, self.field, self.reason)
    }
}

/// Aggregated missing references, rendered one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReferences(pub Vec<MissingReference>);

impl MissingReferences {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MissingReference> {
        self.0.iter()
    }
}

impl fmt::Display for MissingReferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, missing) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {missing}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RdfError {
    /// Network or filesystem failure while opening a source.
    #[error("unreachable source {location}: {reason}")]
    UnreachableSource { location: String, reason: String },

    /// Syntax-level failure while parsing a description.
    #[error("malformed description {origin} at line {line}, column {column}: {message}")]
    MalformedDescription {
        origin: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// The declared `format_version` is outside the supported window.
    #[error("unsupported format_version '{found}' in {origin} (supported: {oldest} to {newest})")]
    UnsupportedVersion {
        origin: String,
        found: String,
        oldest: String,
        newest: String,
    },

    /// One or more referenced files could not be collected for a package.
    #[error("{count} referenced file(s) missing:\n{missing}", count = .0.len(), missing = .0)]
    MissingReferencedFiles(MissingReferences),

    /// The output location cannot be written.
    #[error("cannot write {}: {reason}", .target.display())]
    UnwritableTarget { target: PathBuf, reason: String },

    /// A description with error findings was handed to a consumer that requires a valid one.
    #[error("description failed validation with {errors} error(s); first: {first}")]
    ValidationFailed { errors: usize, first: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RdfError {
    /// Exit code for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::ValidationFailed { .. } => 2,
            Self::MalformedDescription { .. } | Self::UnsupportedVersion { .. } => 3,
            Self::UnreachableSource { .. } | Self::MissingReferencedFiles(_) => 4,
            Self::UnwritableTarget { .. } | Self::Io(_) => 5,
            Self::Cache(_) | Self::Serialization(_) => 6,
        }
    }

    /// Short machine-readable code used in JSON output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnreachableSource { .. } => "unreachable_source",
            Self::MalformedDescription { .. } => "malformed_description",
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::MissingReferencedFiles(_) => "missing_referenced_file",
            Self::UnwritableTarget { .. } => "unwritable_target",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::Config(_) => "config",
            Self::Cache(_) => "cache",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    pub(crate) fn unwritable(target: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::UnwritableTarget {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unreachable(location: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::UnreachableSource {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for RdfError {
    fn from(err: reqwest::Error) -> Self {
        let location = err
            .url()
            .map_or_else(|| "<unknown url>".to_string(), ToString::to_string);
        Self::UnreachableSource {
            location,
            reason: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for RdfError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Serialization(format!("zip: {err}"))
    }
}

impl From<serde_yaml::Error> for RdfError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(format!("yaml: {err}"))
    }
}

impl From<serde_json::Error> for RdfError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("json: {err}"))
    }
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, RdfError>;

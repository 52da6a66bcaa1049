//! What went into a package.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RdfError, Result};
use crate::rdf::FileRole;

/// One file inside a package archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Member name inside the archive.
    pub archive_path: String,
    /// Where the bytes came from.
    pub source: String,
    pub role: FileRole,
    pub sha256: String,
    pub size: u64,
    /// `false` for extra files that no description field points at.
    pub referenced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub target: PathBuf,
    pub format_version: String,
    /// Entries in archive order; the first is always the description.
    pub entries: Vec<ManifestEntry>,
}

impl PackageManifest {
    #[must_use]
    pub fn description(&self) -> Option<&ManifestEntry> {
        self.entries.first()
    }

    pub fn archive_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.archive_path.as_str())
    }

    #[must_use]
    pub fn find(&self, archive_path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.archive_path == archive_path)
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| RdfError::Serialization(format!("package manifest JSON: {err}")))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|err| RdfError::Serialization(format!("package manifest YAML: {err}")))
    }
}

/// Archive member names handed out so far; collisions get `-1`, `-2`, ...
/// before the extension.
#[derive(Debug, Default)]
pub(crate) struct PathAllocator {
    taken: std::collections::HashSet<String>,
}

impl PathAllocator {
    pub(crate) fn reserve(&mut self, path: &str) {
        self.taken.insert(path.to_string());
    }

    pub(crate) fn allocate(&mut self, dir: &str, name: &str) -> String {
        let join = |name: &str| {
            if dir.is_empty() {
                name.to_string()
            } else {
                format!("{dir}/{name}")
            }
        };

        let mut candidate = join(name);
        let (stem, ext) = match name.split_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        let mut counter = 1;
        while self.taken.contains(&candidate) {
            let numbered = ext.map_or_else(
                || format!("{stem}-{counter}"),
                |ext| format!("{stem}-{counter}.{ext}"),
            );
            candidate = join(&numbered);
            counter += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

//! Bundling a description and its files into a zip package.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::manifest::{ManifestEntry, PackageManifest, PathAllocator};
use crate::config::{Compression, PackageConfig};
use crate::error::{MissingReference, MissingReferences, RdfError, Result};
use crate::lint::ValidationEngine;
use crate::rdf::{DESCRIPTION_FILE_NAME, FileReference, FileRole, ResourceDescription};
use crate::source::{Located, SourceResolver, locate, sha256_hex};
use crate::writer::{lexical_normalize, to_yaml_string};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOptions {
    /// Replace an existing file at the target path.
    pub overwrite: bool,
    /// Refuse descriptions whose validation report has errors.
    pub require_valid: bool,
    pub compression: Compression,
    /// Local files added under `attachments/` without a description field
    /// pointing at them.
    pub extra_files: Vec<PathBuf>,
}

impl PackageOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub const fn require_valid(mut self, require: bool) -> Self {
        self.require_valid = require;
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_extra_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.extra_files.push(path.into());
        self
    }
}

impl From<&PackageConfig> for PackageOptions {
    fn from(config: &PackageConfig) -> Self {
        Self {
            overwrite: config.overwrite,
            require_valid: config.require_valid,
            compression: config.compression,
            extra_files: Vec::new(),
        }
    }
}

/// File bytes waiting to be written, in archive order.
struct PlannedFile {
    archive_path: String,
    source: String,
    role: FileRole,
    bytes: Vec<u8>,
    referenced: bool,
}

/// Everything needed to write the archive once all files are in hand.
struct Plan {
    files: Vec<PlannedFile>,
    /// Description reference to its member name.
    renames: HashMap<FileReference, String>,
}

pub struct PackageBuilder<'a> {
    resolver: &'a SourceResolver,
    engine: &'a ValidationEngine,
    options: PackageOptions,
}

impl<'a> PackageBuilder<'a> {
    #[must_use]
    pub const fn new(
        resolver: &'a SourceResolver,
        engine: &'a ValidationEngine,
        options: PackageOptions,
    ) -> Self {
        Self {
            resolver,
            engine,
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &PackageOptions {
        &self.options
    }

    /// Write `description` and every file it references to the zip at
    /// `target`. Nothing is left at `target` unless the whole archive was
    /// written.
    pub fn build(&self, description: &ResourceDescription, target: &Path) -> Result<PackageManifest> {
        self.ensure_valid(description)?;
        let target = self.check_target(target)?;
        let plan = self.plan(description)?;

        let mut packaged = description.clone();
        packaged.map_references(|reference| {
            Ok(plan
                .renames
                .get(reference)
                .map_or_else(|| reference.clone(), |path| FileReference::Path(path.clone())))
        })?;
        let rdf = to_yaml_string(&packaged)?.into_bytes();

        let mut entries = Vec::with_capacity(plan.files.len() + 1);
        entries.push(ManifestEntry {
            archive_path: DESCRIPTION_FILE_NAME.to_string(),
            source: description.root.to_string(),
            role: FileRole::Description,
            sha256: sha256_hex(&rdf),
            size: rdf.len() as u64,
            referenced: true,
        });
        entries.extend(plan.files.iter().map(|file| ManifestEntry {
            archive_path: file.archive_path.clone(),
            source: file.source.clone(),
            role: file.role,
            sha256: sha256_hex(&file.bytes),
            size: file.bytes.len() as u64,
            referenced: file.referenced,
        }));

        self.write_archive(&target, &rdf, &plan.files)?;

        let manifest = PackageManifest {
            target,
            format_version: description.format_version.to_string(),
            entries,
        };
        info!(
            target = %manifest.target.display(),
            entries = manifest.entries.len(),
            bytes = manifest.total_size(),
            "wrote package"
        );
        Ok(manifest)
    }

    fn ensure_valid(&self, description: &ResourceDescription) -> Result<()> {
        if !self.options.require_valid {
            return Ok(());
        }
        let report = self.engine.validate(description);
        if report.passed {
            return Ok(());
        }
        let first = report
            .errors()
            .next()
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(errors = report.error_count(), "refusing to package an invalid description");
        Err(RdfError::ValidationFailed {
            errors: report.error_count(),
            first,
        })
    }

    fn check_target(&self, target: &Path) -> Result<PathBuf> {
        let target = std::path::absolute(target).map_err(|err| RdfError::unwritable(target, err))?;
        if target.is_dir() {
            return Err(RdfError::unwritable(&target, "is a directory"));
        }
        if target.exists() && !self.options.overwrite {
            return Err(RdfError::unwritable(
                &target,
                "already exists; enable overwrite to replace it",
            ));
        }
        if !target.parent().is_some_and(Path::is_dir) {
            return Err(RdfError::unwritable(&target, "parent directory does not exist"));
        }
        Ok(target)
    }

    /// Open every referenced file, assigning member names. All failures are
    /// collected before giving up.
    fn plan(&self, description: &ResourceDescription) -> Result<Plan> {
        let mut paths = PathAllocator::default();
        paths.reserve(DESCRIPTION_FILE_NAME);
        let mut by_location: HashMap<String, String> = HashMap::new();
        let mut renames: HashMap<FileReference, String> = HashMap::new();
        let mut files = Vec::new();
        let mut missing = Vec::new();
        // locations already reported missing
        let mut failed: HashSet<String> = HashSet::new();

        for site in description.file_references() {
            if renames.contains_key(&site.reference) {
                continue;
            }
            let key = match locate(&site.reference, &description.root) {
                Ok(located) => location_key(&located),
                Err(err) => {
                    if failed.insert(site.reference.to_string()) {
                        missing.push(missing_reference(site.field, &site.reference, &err));
                    }
                    continue;
                }
            };
            if failed.contains(&key) {
                continue;
            }
            if let Some(path) = by_location.get(&key) {
                debug!(reference = %site.reference, member = %path, "reusing packaged file");
                renames.insert(site.reference, path.clone());
                continue;
            }

            match self.resolver.open(&site.reference, &description.root) {
                Ok(bytes) => {
                    let name = site.reference.file_name().unwrap_or_else(|| "file".to_string());
                    let path = paths.allocate(site.role.directory(), &name);
                    by_location.insert(key.clone(), path.clone());
                    renames.insert(site.reference, path.clone());
                    files.push(PlannedFile {
                        archive_path: path,
                        source: key,
                        role: site.role,
                        bytes,
                        referenced: true,
                    });
                }
                Err(err) => {
                    failed.insert(key);
                    missing.push(missing_reference(site.field, &site.reference, &err));
                }
            }
        }

        for (idx, extra) in self.options.extra_files.iter().enumerate() {
            let absolute = lexical_normalize(&std::path::absolute(extra)?);
            let key = absolute.display().to_string();
            if by_location.contains_key(&key) {
                continue;
            }
            match std::fs::read(&absolute) {
                Ok(bytes) => {
                    let name = absolute
                        .file_name()
                        .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().into_owned());
                    let path = paths.allocate(FileRole::Attachment.directory(), &name);
                    by_location.insert(key.clone(), path.clone());
                    files.push(PlannedFile {
                        archive_path: path,
                        source: key,
                        role: FileRole::Attachment,
                        bytes,
                        referenced: false,
                    });
                }
                Err(err) => missing.push(MissingReference {
                    field: format!("extra_files[{idx}]"),
                    reference: extra.display().to_string(),
                    reason: err.to_string(),
                }),
            }
        }

        if !missing.is_empty() {
            warn!(missing = missing.len(), "referenced files could not be opened");
            return Err(RdfError::MissingReferencedFiles(MissingReferences(missing)));
        }
        Ok(Plan { files, renames })
    }

    fn write_archive(&self, target: &Path, rdf: &[u8], files: &[PlannedFile]) -> Result<()> {
        let parent = target
            .parent()
            .ok_or_else(|| RdfError::unwritable(target, "no parent directory"))?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(|err| RdfError::unwritable(target, err))?;

        let method = match self.options.compression {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        };
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        {
            let mut zip = ZipWriter::new(tmp.as_file_mut());
            let members = std::iter::once((DESCRIPTION_FILE_NAME, rdf))
                .chain(files.iter().map(|f| (f.archive_path.as_str(), f.bytes.as_slice())));
            for (name, bytes) in members {
                zip.start_file(name, options)
                    .map_err(|err| RdfError::unwritable(target, err))?;
                zip.write_all(bytes)
                    .map_err(|err| RdfError::unwritable(target, err))?;
            }
            zip.finish().map_err(|err| RdfError::unwritable(target, err))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|err| RdfError::unwritable(target, err))?;

        let persisted = if self.options.overwrite {
            tmp.persist(target)
        } else {
            tmp.persist_noclobber(target)
        };
        persisted.map_err(|err| RdfError::unwritable(target, err.error))?;
        Ok(())
    }
}

fn location_key(located: &Located) -> String {
    match located {
        Located::Local(path) => lexical_normalize(path).display().to_string(),
        other => other.to_string(),
    }
}

fn missing_reference(field: String, reference: &FileReference, err: &RdfError) -> MissingReference {
    let reason = match err {
        RdfError::UnreachableSource { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    MissingReference {
        field,
        reference: reference.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;

    use super::*;
    use crate::config::ResolverConfig;
    use crate::lint::ValidationConfig;
    use crate::rdf::DescriptionParser;
    use crate::source::{BaseLocation, RemoteFetcher};

    const MODEL: &str = r"format_version: 0.4.10
type: model
name: unet
description: segments nuclei
authors:
  - name: Jane Doe
covers: [cover.png, img/cover.png]
inputs:
  - name: raw
    axes: bcyx
    data_type: float32
    shape: [1, 1, 64, 64]
outputs:
  - name: mask
    axes: bcyx
    data_type: float32
    shape: [1, 1, 64, 64]
test_inputs: [in.npy]
test_outputs: [out.npy]
weights:
  torchscript:
    source: weights.pt
  onnx:
    source: ./weights.pt
";

    fn resolver() -> SourceResolver {
        SourceResolver::new(RemoteFetcher::new(&ResolverConfig::default(), None).unwrap())
    }

    fn model_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("img")).unwrap();
        for (name, bytes) in [
            ("cover.png", b"c1".as_slice()),
            ("img/cover.png", b"c2".as_slice()),
            ("in.npy", b"in".as_slice()),
            ("out.npy", b"out".as_slice()),
            ("weights.pt", b"weights".as_slice()),
        ] {
            fs::write(dir.path().join(name), bytes).unwrap();
        }
        dir
    }

    fn parse(dir: &Path, yaml: &str) -> ResourceDescription {
        DescriptionParser::default()
            .parse(yaml.as_bytes(), BaseLocation::Directory(dir.to_path_buf()), "<test>")
            .unwrap()
    }

    fn member_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        archive.file_names().map(ToString::to_string).collect()
    }

    #[test]
    fn packages_every_reference_once() {
        let dir = model_dir();
        let rd = parse(dir.path(), MODEL);
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let target = dir.path().join("unet.zip");

        let manifest = PackageBuilder::new(&resolver, &engine, PackageOptions::new())
            .build(&rd, &target)
            .unwrap();

        let paths: Vec<_> = manifest.archive_paths().collect();
        assert_eq!(
            paths,
            [
                "rdf.yaml",
                "covers/cover.png",
                "covers/cover-1.png",
                "test_tensors/in.npy",
                "test_tensors/out.npy",
                "weights/weights.pt",
            ]
        );

        let mut names = member_names(&target);
        names.sort();
        let mut expected: Vec<_> = paths.iter().map(ToString::to_string).collect();
        expected.sort();
        assert_eq!(names, expected);

        let mut archive = zip::ZipArchive::new(fs::File::open(&target).unwrap()).unwrap();
        let mut text = String::new();
        archive
            .by_name("rdf.yaml")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        let packaged = parse(dir.path(), &text);
        let weights = packaged.weights.value().unwrap();
        assert_eq!(weights["onnx"].source, FileReference::from("weights/weights.pt"));
        assert_eq!(weights["torchscript"].source, FileReference::from("weights/weights.pt"));
        // the caller's description keeps its references
        assert_eq!(rd.weights.value().unwrap()["onnx"].source, FileReference::from("./weights.pt"));
    }

    #[test]
    fn missing_files_are_reported_together() {
        let dir = model_dir();
        fs::remove_file(dir.path().join("in.npy")).unwrap();
        fs::remove_file(dir.path().join("cover.png")).unwrap();
        let rd = parse(dir.path(), MODEL);
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let target = dir.path().join("unet.zip");

        let err = PackageBuilder::new(&resolver, &engine, PackageOptions::new())
            .build(&rd, &target)
            .unwrap_err();
        let missing = match err {
            RdfError::MissingReferencedFiles(missing) => missing,
            other => panic!("expected missing files, got {other}"),
        };
        let fields: Vec<_> = missing.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(fields, ["covers[0]", "test_inputs[0]"]);
        assert!(!target.exists());
    }

    #[test]
    fn existing_targets_need_overwrite() {
        let dir = model_dir();
        let rd = parse(dir.path(), MODEL);
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let target = dir.path().join("unet.zip");
        fs::write(&target, b"old").unwrap();

        let err = PackageBuilder::new(&resolver, &engine, PackageOptions::new())
            .build(&rd, &target)
            .unwrap_err();
        assert!(matches!(err, RdfError::UnwritableTarget { .. }));
        assert_eq!(fs::read(&target).unwrap(), b"old");

        PackageBuilder::new(&resolver, &engine, PackageOptions::new().overwrite(true))
            .build(&rd, &target)
            .unwrap();
        assert!(crate::source::looks_like_zip(&fs::read(&target).unwrap()));
    }

    #[test]
    fn a_missing_file_is_reported_once() {
        let dir = model_dir();
        let rd = parse(
            dir.path(),
            "format_version: 0.5.3\ntype: dataset\nname: cells\ncovers: [b.png]\ndocumentation: ./b.png\n",
        );
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let target = dir.path().join("cells.zip");

        let err = PackageBuilder::new(&resolver, &engine, PackageOptions::new())
            .build(&rd, &target)
            .unwrap_err();
        let missing = match err {
            RdfError::MissingReferencedFiles(missing) => missing,
            other => panic!("expected missing files, got {other}"),
        };
        assert_eq!(missing.len(), 1);
        assert!(missing.iter().all(|m| m.reference.ends_with("b.png")));
        assert!(!target.exists());
    }

    #[test]
    fn invalid_descriptions_are_packaged_unless_validity_is_required() {
        let dir = model_dir();
        let rd = parse(dir.path(), "format_version: 0.4.10\ntype: model\nname: broken\n");
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let target = dir.path().join("broken.zip");

        let err = PackageBuilder::new(&resolver, &engine, PackageOptions::new().require_valid(true))
            .build(&rd, &target)
            .unwrap_err();
        assert!(matches!(err, RdfError::ValidationFailed { .. }));
        assert!(!target.exists());

        let manifest = PackageBuilder::new(&resolver, &engine, PackageOptions::new())
            .build(&rd, &target)
            .unwrap();
        assert_eq!(manifest.entries.len(), 1);
    }

    #[test]
    fn extra_files_are_unreferenced_attachments() {
        let dir = model_dir();
        fs::write(dir.path().join("LICENSE"), b"MIT").unwrap();
        let rd = parse(dir.path(), MODEL);
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let options = PackageOptions::new().with_extra_file(dir.path().join("LICENSE"));

        let manifest = PackageBuilder::new(&resolver, &engine, options)
            .build(&rd, &dir.path().join("unet.zip"))
            .unwrap();
        let license = manifest.find("attachments/LICENSE").unwrap();
        assert!(!license.referenced);
        assert_eq!(license.size, 3);
    }

    #[test]
    fn archives_are_reproducible() {
        let dir = model_dir();
        let rd = parse(dir.path(), MODEL);
        let resolver = resolver();
        let engine = ValidationEngine::standard(ValidationConfig::new());
        let builder = PackageBuilder::new(&resolver, &engine, PackageOptions::new());

        builder.build(&rd, &dir.path().join("a.zip")).unwrap();
        builder.build(&rd, &dir.path().join("b.zip")).unwrap();
        assert_eq!(
            fs::read(dir.path().join("a.zip")).unwrap(),
            fs::read(dir.path().join("b.zip")).unwrap()
        );
    }
}

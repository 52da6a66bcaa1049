//! Canonical serialization and writing of descriptions.
//!
//! Known keys are emitted in the order defined for the description's format
//! revision, followed by unrecognized keys in sorted order. Writing to a new
//! directory rewrites relative file references so they keep pointing at the
//! same files.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{RdfError, Result};
use crate::rdf::{DESCRIPTION_FILE_NAME, FileReference, ResourceDescription};
use crate::source::{BaseLocation, Located, locate};
use crate::spec_version::Revision;

const KEY_ORDER_V04: &[&str] = &[
    "format_version",
    "type",
    "id",
    "name",
    "description",
    "version",
    "authors",
    "maintainers",
    "cite",
    "license",
    "tags",
    "git_repo",
    "documentation",
    "covers",
    "attachments",
    "inputs",
    "outputs",
    "test_inputs",
    "test_outputs",
    "sample_inputs",
    "sample_outputs",
    "weights",
    "config",
];

const KEY_ORDER_V05: &[&str] = &[
    "format_version",
    "type",
    "id",
    "name",
    "description",
    "version",
    "authors",
    "maintainers",
    "cite",
    "license",
    "tags",
    "git_repo",
    "documentation",
    "covers",
    "attachments",
    "inputs",
    "outputs",
    "weights",
    "config",
    // 0.4 leftovers are still emitted when present
    "test_inputs",
    "test_outputs",
    "sample_inputs",
    "sample_outputs",
];

/// Known keys in emission order for `revision`.
#[must_use]
pub const fn key_order(revision: Revision) -> &'static [&'static str] {
    match revision {
        Revision::V0_4 => KEY_ORDER_V04,
        Revision::V0_5 => KEY_ORDER_V05,
    }
}

/// The description as an ordered YAML mapping.
pub fn canonical_mapping(description: &ResourceDescription) -> Result<Mapping> {
    let mut map = Mapping::new();
    for key in key_order(description.revision()) {
        if let Some(value) = description.field_yaml(key)? {
            map.insert(Value::String((*key).to_string()), value);
        }
    }
    for (key, value) in &description.unrecognized {
        map.insert(Value::String(key.clone()), value.clone());
    }
    Ok(map)
}

/// Canonical YAML text of a description.
pub fn to_yaml_string(description: &ResourceDescription) -> Result<String> {
    Ok(serde_yaml::to_string(&Value::Mapping(canonical_mapping(description)?))?)
}

/// Writes descriptions to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionWriter;

impl DescriptionWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Write `description` to `target` and return the file written. A
    /// directory target receives `rdf.yaml`. The caller's description is not
    /// modified; a rebased copy is serialized.
    pub fn write(&self, description: &ResourceDescription, target: &Path) -> Result<PathBuf> {
        let path = Self::target_file(target)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| RdfError::unwritable(&path, "no parent directory"))?;
        if !parent.is_dir() {
            return Err(RdfError::unwritable(&path, "parent directory does not exist"));
        }

        let rebased = rebase(description, &parent)?;
        let text = to_yaml_string(&rebased)?;

        let mut tmp = NamedTempFile::new_in(&parent).map_err(|err| RdfError::unwritable(&path, err))?;
        tmp.write_all(text.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| RdfError::unwritable(&path, err))?;
        tmp.persist(&path)
            .map_err(|err| RdfError::unwritable(&path, err.error))?;

        info!(path = %path.display(), format_version = %description.format_version, "wrote description");
        Ok(path)
    }

    fn target_file(target: &Path) -> Result<PathBuf> {
        let target = std::path::absolute(target).map_err(|err| RdfError::unwritable(target, err))?;
        let names_dir = target.is_dir()
            || target
                .as_os_str()
                .to_string_lossy()
                .ends_with(std::path::MAIN_SEPARATOR);
        Ok(if names_dir {
            target.join(DESCRIPTION_FILE_NAME)
        } else {
            target
        })
    }
}

/// Copy of `description` whose relative references resolve from `dir`.
///
/// Directory roots get paths relative to `dir` (absolute paths when no
/// relative path exists), URL roots get absolute URLs. Archive roots fail
/// when the description has relative references, since the members would be
/// left behind; package such descriptions instead.
pub fn rebase(description: &ResourceDescription, dir: &Path) -> Result<ResourceDescription> {
    let dir = lexical_normalize(&std::path::absolute(dir)?);
    let mut rebased = description.clone();

    match &description.root {
        BaseLocation::Directory(root) if lexical_normalize(root) == dir => {}
        BaseLocation::Archive(archive) => {
            rebased.map_references(|reference| match reference {
                FileReference::Path(path) if !path.trim().is_empty() && !Path::new(path).is_absolute() => {
                    Err(RdfError::unwritable(
                        &dir,
                        format!("'{path}' lives inside {archive}; write a package to keep it"),
                    ))
                }
                other => Ok(other.clone()),
            })?;
        }
        root => {
            rebased.map_references(|reference| rebase_reference(reference, root, &dir))?;
        }
    }

    rebased.root = BaseLocation::Directory(dir);
    Ok(rebased)
}

fn rebase_reference(reference: &FileReference, root: &BaseLocation, dir: &Path) -> Result<FileReference> {
    let FileReference::Path(path) = reference else {
        return Ok(reference.clone());
    };
    if path.trim().is_empty() || Path::new(path).is_absolute() {
        return Ok(reference.clone());
    }
    let rewritten = match locate(reference, root)? {
        Located::Local(file) => {
            let file = lexical_normalize(&file);
            relative_path(dir, &file).map_or_else(
                || FileReference::Path(file.to_string_lossy().into_owned()),
                FileReference::Path,
            )
        }
        Located::Remote(url) => FileReference::Url(url),
        // archive roots are handled by the caller
        Located::Member(..) => reference.clone(),
    };
    debug!(from = %reference, to = %rewritten, "rebased reference");
    Ok(rewritten)
}

/// Resolve `.` and `..` components without touching the filesystem.
#[must_use]
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `to` relative to the directory `from`, with `/` separators. Both must be
/// absolute; `None` when they share no root.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> Option<String> {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    if from.first() != to.first() {
        return None;
    }
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use reqwest::Url;

    use super::*;
    use crate::rdf::{DescriptionParser, KNOWN_FIELDS};

    fn parse_at(yaml: &str, root: BaseLocation) -> ResourceDescription {
        DescriptionParser::default()
            .parse(yaml.as_bytes(), root, "<test>")
            .unwrap()
    }

    #[test]
    fn key_orders_cover_every_known_field() {
        for revision in [Revision::V0_4, Revision::V0_5] {
            let order: BTreeSet<_> = key_order(revision).iter().copied().collect();
            let mut known: BTreeSet<_> = KNOWN_FIELDS.iter().copied().collect();
            known.insert("format_version");
            assert_eq!(order, known, "{revision}");
        }
    }

    #[test]
    fn canonical_order_then_sorted_unknowns() {
        let rd = parse_at(
            "zeta: 1\nname: unet\nalpha: 2\ntype: model\nformat_version: 0.4.10\n",
            BaseLocation::Directory("/m".into()),
        );
        let text = to_yaml_string(&rd).unwrap();
        let keys: Vec<_> = text
            .lines()
            .filter(|l| !l.starts_with(' '))
            .filter_map(|l| l.split(':').next())
            .collect();
        assert_eq!(keys, ["format_version", "type", "name", "alpha", "zeta"]);
    }

    #[test]
    fn writes_into_directories_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let rd = parse_at(
            "format_version: 0.5.3\ntype: dataset\nname: d\ncovers: [c.png]\n",
            BaseLocation::Directory(dir.path().to_path_buf()),
        );
        let written = DescriptionWriter::new().write(&rd, dir.path()).unwrap();
        assert_eq!(written.file_name().unwrap(), "rdf.yaml");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let text = std::fs::read_to_string(&written).unwrap();
        assert!(text.contains("- c.png"));
    }

    #[test]
    fn references_follow_a_move() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&out).unwrap();

        let rd = parse_at(
            "format_version: 0.5.3\ntype: dataset\nname: d\ncovers: [img/c.png, 'https://x.org/c.png']\n",
            BaseLocation::Directory(src),
        );
        let rebased = rebase(&rd, &out).unwrap();
        assert_eq!(
            rebased.covers.value().unwrap(),
            &vec![
                FileReference::from("../src/img/c.png"),
                FileReference::from("https://x.org/c.png"),
            ]
        );
        // the original is untouched
        assert_eq!(rd.covers.value().unwrap()[0], FileReference::from("img/c.png"));
    }

    #[test]
    fn url_roots_become_absolute() {
        let rd = parse_at(
            "format_version: 0.5.3\ntype: dataset\nname: d\ndocumentation: README.md\n",
            BaseLocation::Url(Url::parse("https://zoo.example.com/unet/").unwrap()),
        );
        let rebased = rebase(&rd, Path::new("/tmp")).unwrap();
        assert_eq!(
            rebased.documentation.value().unwrap(),
            &FileReference::from("https://zoo.example.com/unet/README.md")
        );
    }

    #[test]
    fn archive_roots_refuse_relative_references() {
        let archive = crate::source::ArchiveSource::File("/m/model.zip".into());
        let rd = parse_at(
            "format_version: 0.5.3\ntype: dataset\nname: d\ndocumentation: README.md\n",
            BaseLocation::Archive(archive),
        );
        let err = rebase(&rd, Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, RdfError::UnwritableTarget { .. }));
    }

    #[test]
    fn missing_parent_is_unwritable() {
        let rd = parse_at("format_version: 0.5.3\nname: d\n", BaseLocation::Directory("/m".into()));
        let err = DescriptionWriter::new()
            .write(&rd, Path::new("/definitely/not/here/rdf.yaml"))
            .unwrap_err();
        assert!(matches!(err, RdfError::UnwritableTarget { .. }));
    }

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/a/c/d.txt")).as_deref(),
            Some("../c/d.txt")
        );
        assert_eq!(
            relative_path(Path::new("/a"), Path::new("/a/x.txt")).as_deref(),
            Some("x.txt")
        );
        assert_eq!(
            lexical_normalize(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }
}

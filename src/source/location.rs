//! Base locations that relative references are resolved against.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{RdfError, Result};

/// Leading bytes of a zip local file header.
pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[must_use]
pub fn looks_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// A zip archive acting as a base location, on disk or held in memory
/// (packages downloaded from a URL).
#[derive(Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    File(PathBuf),
    Memory { name: String, bytes: Arc<Vec<u8>> },
}

impl fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory { name, .. } => write!(f, "{name}"),
        }
    }
}

impl ArchiveSource {
    /// Names of all members, in archive order.
    pub fn member_names(&self) -> Result<Vec<String>> {
        self.with_archive(|archive| Ok(archive.file_names().map(ToString::to_string).collect()))
    }

    /// Read one member. `None` when the archive has no such member.
    pub fn read_member(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let name = normalize_member(name);
        self.with_archive(|archive| archive.read_named(&name))
    }

    fn with_archive<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn ArchiveReader) -> Result<T>,
    {
        match self {
            Self::File(path) => {
                let file = File::open(path).map_err(|err| RdfError::unreachable(path.display(), err))?;
                let mut archive = ZipArchive::new(file)
                    .map_err(|err| RdfError::unreachable(path.display(), err))?;
                f(&mut archive)
            }
            Self::Memory { name, bytes } => {
                let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
                    .map_err(|err| RdfError::unreachable(name, err))?;
                f(&mut archive)
            }
        }
    }
}

/// Object-safe view over `ZipArchive<R>` for any reader.
trait ArchiveReader {
    fn file_names(&self) -> Box<dyn Iterator<Item = &str> + '_>;
    fn read_named(&mut self, name: &str) -> Result<Option<Vec<u8>>>;
}

impl<R: Read + Seek> ArchiveReader for ZipArchive<R> {
    fn file_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(Self::file_names(self))
    }

    fn read_named(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.by_name(name) {
            Ok(mut member) => {
                let mut buf = Vec::with_capacity(usize::try_from(member.size()).unwrap_or(0));
                member.read_to_end(&mut buf)?;
                Ok(Some(buf))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Member name as stored in an archive: forward slashes, no leading `./`.
#[must_use]
pub fn normalize_member(name: &str) -> String {
    let name = name.replace('\\', "/");
    let mut trimmed = name.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_start_matches('/').to_string()
}

/// Where a description came from; sibling references resolve against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseLocation {
    Directory(PathBuf),
    Url(Url),
    Archive(ArchiveSource),
}

impl BaseLocation {
    /// The current working directory, used for in-memory sources.
    pub fn current_dir() -> Result<Self> {
        Ok(Self::Directory(std::env::current_dir()?))
    }

    /// Directory containing `path`, made absolute.
    pub fn parent_of(path: &Path) -> Result<Self> {
        let absolute = std::path::absolute(path)?;
        let dir = absolute
            .parent()
            .map_or_else(|| absolute.clone(), Path::to_path_buf);
        Ok(Self::Directory(dir))
    }

    #[must_use]
    pub const fn directory(&self) -> Option<&PathBuf> {
        match self {
            Self::Directory(dir) => Some(dir),
            _ => None,
        }
    }
}

impl fmt::Display for BaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Url(url) => write!(f, "{url}"),
            Self::Archive(archive) => write!(f, "zip:{archive}"),
        }
    }
}

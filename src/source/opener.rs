//! Strategies for opening a file reference relative to a base location.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;

use super::fetch::RemoteFetcher;
use super::location::{ArchiveSource, BaseLocation, normalize_member};
use crate::error::{RdfError, Result};
use crate::rdf::FileReference;

/// Absolute location of a reference once its base is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Local(PathBuf),
    Remote(Url),
    Member(ArchiveSource, String),
}

impl fmt::Display for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
            Self::Member(archive, member) => write!(f, "{archive}!{member}"),
        }
    }
}

/// Apply `base` to `reference`.
pub fn locate(reference: &FileReference, base: &BaseLocation) -> Result<Located> {
    match (reference, base) {
        (FileReference::Url(url), _) if url.scheme() == "file" => url
            .to_file_path()
            .map(Located::Local)
            .map_err(|()| RdfError::unreachable(url, "not a local file URL")),
        (FileReference::Url(url), _) => Ok(Located::Remote(url.clone())),
        (FileReference::Path(path), _) if path.trim().is_empty() => {
            Err(RdfError::unreachable("<empty>", "empty file reference"))
        }
        (FileReference::Path(path), _) if Path::new(path).is_absolute() => {
            Ok(Located::Local(PathBuf::from(path)))
        }
        (FileReference::Path(path), BaseLocation::Directory(dir)) => Ok(Located::Local(dir.join(path))),
        (FileReference::Path(path), BaseLocation::Url(url)) => url
            .join(&path.replace('\\', "/"))
            .map(Located::Remote)
            .map_err(|err| RdfError::unreachable(path, format!("cannot join onto {url}: {err}"))),
        (FileReference::Path(path), BaseLocation::Archive(archive)) => {
            Ok(Located::Member(archive.clone(), normalize_member(path)))
        }
    }
}

/// One way of turning a reference into bytes. `Ok(None)` means the
/// reference is not this opener's kind; errors are real failures.
pub trait SourceOpener: Send + Sync {
    fn name(&self) -> &'static str;

    fn opens(&self, reference: &FileReference, base: &BaseLocation) -> Result<Option<Vec<u8>>>;
}

pub type BoxedOpener = Box<dyn SourceOpener>;

pub struct LocalFileOpener;

impl SourceOpener for LocalFileOpener {
    fn name(&self) -> &'static str {
        "local-file"
    }

    fn opens(&self, reference: &FileReference, base: &BaseLocation) -> Result<Option<Vec<u8>>> {
        let Located::Local(path) = locate(reference, base)? else {
            return Ok(None);
        };
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RdfError::unreachable(path.display(), "file not found"))
            }
            Err(err) => Err(RdfError::unreachable(path.display(), err)),
        }
    }
}

pub struct RemoteOpener {
    fetcher: Arc<RemoteFetcher>,
}

impl RemoteOpener {
    #[must_use]
    pub const fn new(fetcher: Arc<RemoteFetcher>) -> Self {
        Self { fetcher }
    }
}

impl SourceOpener for RemoteOpener {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn opens(&self, reference: &FileReference, base: &BaseLocation) -> Result<Option<Vec<u8>>> {
        let Located::Remote(url) = locate(reference, base)? else {
            return Ok(None);
        };
        self.fetcher.fetch(&url).map(Some)
    }
}

pub struct ArchiveMemberOpener;

impl SourceOpener for ArchiveMemberOpener {
    fn name(&self) -> &'static str {
        "archive-member"
    }

    fn opens(&self, reference: &FileReference, base: &BaseLocation) -> Result<Option<Vec<u8>>> {
        let Located::Member(archive, member) = locate(reference, base)? else {
            return Ok(None);
        };
        archive
            .read_member(&member)?
            .map(Some)
            .ok_or_else(|| RdfError::unreachable(format!("{archive}!{member}"), "no such archive member"))
    }
}

//! Turning source references into bytes plus a base location.

pub mod cache;
pub mod fetch;
pub mod location;
pub mod opener;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info, warn};

pub use cache::{CacheEntry, FetchCache, sha256_hex};
pub use fetch::RemoteFetcher;
pub use location::{ArchiveSource, BaseLocation, looks_like_zip};
pub use opener::{
    ArchiveMemberOpener, BoxedOpener, LocalFileOpener, Located, RemoteOpener, SourceOpener, locate,
};

use crate::config::Config;
use crate::error::{RdfError, Result};
use crate::rdf::{FileReference, ResourceDescription, find_description_name};

/// Anything a description can be read from.
#[derive(Debug, Clone)]
pub enum SourceRef {
    Path(PathBuf),
    Url(Url),
    Text(String),
    Bytes(Vec<u8>),
    Document(Box<ResourceDescription>),
}

impl SourceRef {
    /// Interpret a command-line argument: `http(s)://` and `file://` are URLs,
    /// everything else a path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file://")
        {
            if let Ok(url) = Url::parse(raw) {
                return Self::Url(url);
            }
        }
        Self::Path(PathBuf::from(raw))
    }
}

impl From<&str> for SourceRef {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<PathBuf> for SourceRef {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for SourceRef {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Url> for SourceRef {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}

impl From<ResourceDescription> for SourceRef {
    fn from(description: ResourceDescription) -> Self {
        Self::Document(Box::new(description))
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
            Self::Text(_) => write!(f, "<text>"),
            Self::Bytes(_) => write!(f, "<bytes>"),
            Self::Document(_) => write!(f, "<document>"),
        }
    }
}

/// Raw description content and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub content: Vec<u8>,
    pub root: BaseLocation,
    /// Human-readable origin used in error messages.
    pub origin: String,
    /// sha256 of `content`.
    pub digest: String,
}

impl ResolvedSource {
    fn new(content: Vec<u8>, root: BaseLocation, origin: String) -> Self {
        let digest = sha256_hex(&content);
        Self {
            content,
            root,
            origin,
            digest,
        }
    }
}

/// Resolves sources and opens referenced files through an ordered list of
/// [`SourceOpener`] strategies.
pub struct SourceResolver {
    openers: Vec<BoxedOpener>,
    fetcher: Arc<RemoteFetcher>,
}

impl SourceResolver {
    /// Resolver with the default strategies: local file, remote, archive member.
    #[must_use]
    pub fn new(fetcher: RemoteFetcher) -> Self {
        let fetcher = Arc::new(fetcher);
        Self {
            openers: vec![
                Box::new(LocalFileOpener),
                Box::new(RemoteOpener::new(Arc::clone(&fetcher))),
                Box::new(ArchiveMemberOpener),
            ],
            fetcher,
        }
    }

    /// Resolver for `config`. A cache directory that cannot be created
    /// disables caching instead of failing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = if config.cache.enabled {
            config.cache_dir().and_then(|dir| match FetchCache::open(&dir) {
                Ok(cache) => Some(cache),
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "fetch cache unavailable");
                    None
                }
            })
        } else {
            None
        };
        Ok(Self::new(RemoteFetcher::new(&config.resolver, cache)?))
    }

    /// Append a strategy; it is tried after the built-in ones.
    pub fn register(&mut self, opener: BoxedOpener) {
        self.openers.push(opener);
    }

    #[must_use]
    pub fn with_opener(mut self, opener: BoxedOpener) -> Self {
        self.register(opener);
        self
    }

    #[must_use]
    pub fn fetcher(&self) -> &RemoteFetcher {
        &self.fetcher
    }

    pub fn resolve(&self, source: &SourceRef) -> Result<ResolvedSource> {
        let resolved = match source {
            SourceRef::Path(path) => Self::resolve_path(path)?,
            SourceRef::Url(url) => self.resolve_url(url)?,
            SourceRef::Text(text) => ResolvedSource::new(
                text.clone().into_bytes(),
                BaseLocation::current_dir()?,
                "<text>".to_string(),
            ),
            SourceRef::Bytes(bytes) => Self::resolve_bytes(bytes)?,
            SourceRef::Document(description) => ResolvedSource::new(
                crate::writer::to_yaml_string(description)?.into_bytes(),
                description.root.clone(),
                "<document>".to_string(),
            ),
        };
        info!(origin = %resolved.origin, root = %resolved.root, sha256 = %resolved.digest, "resolved source");
        Ok(resolved)
    }

    /// Bytes of a file referenced from a description rooted at `base`.
    pub fn open(&self, reference: &FileReference, base: &BaseLocation) -> Result<Vec<u8>> {
        for opener in &self.openers {
            if let Some(bytes) = opener.opens(reference, base)? {
                debug!(opener = opener.name(), reference = %reference, "opened reference");
                return Ok(bytes);
            }
        }
        Err(RdfError::unreachable(
            reference,
            format!("no opener handles this reference relative to {base}"),
        ))
    }

    fn resolve_path(path: &Path) -> Result<ResolvedSource> {
        let metadata = fs::metadata(path).map_err(|err| RdfError::unreachable(path.display(), err))?;
        if metadata.is_dir() {
            let names = file_names(path)?;
            let name = find_description_name(names.iter().map(String::as_str)).ok_or_else(|| {
                RdfError::unreachable(
                    path.display(),
                    "no rdf.yaml, bioimageio.yaml or single *.bioimageio.yaml in directory",
                )
            })?;
            return Self::resolve_path(&path.join(name));
        }

        let content = fs::read(path).map_err(|err| RdfError::unreachable(path.display(), err))?;
        if looks_like_zip(&content) {
            let archive = ArchiveSource::File(std::path::absolute(path)?);
            return Self::resolve_archive(archive);
        }
        Ok(ResolvedSource::new(
            content,
            BaseLocation::parent_of(path)?,
            path.display().to_string(),
        ))
    }

    fn resolve_url(&self, url: &Url) -> Result<ResolvedSource> {
        let content = self.fetcher.fetch(url)?;
        if looks_like_zip(&content) {
            let archive = ArchiveSource::Memory {
                name: url.to_string(),
                bytes: Arc::new(content),
            };
            return Self::resolve_archive(archive);
        }
        if url.scheme() == "file" {
            if let Ok(path) = url.to_file_path() {
                return Ok(ResolvedSource::new(
                    content,
                    BaseLocation::parent_of(&path)?,
                    url.to_string(),
                ));
            }
        }
        let base = url
            .join("./")
            .map_err(|err| RdfError::unreachable(url, format!("no base directory: {err}")))?;
        Ok(ResolvedSource::new(content, BaseLocation::Url(base), url.to_string()))
    }

    fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedSource> {
        if looks_like_zip(bytes) {
            let archive = ArchiveSource::Memory {
                name: "<bytes>".to_string(),
                bytes: Arc::new(bytes.to_vec()),
            };
            return Self::resolve_archive(archive);
        }
        Ok(ResolvedSource::new(
            bytes.to_vec(),
            BaseLocation::current_dir()?,
            "<bytes>".to_string(),
        ))
    }

    /// Unwrap one level of zip: the description member becomes the content
    /// and the archive the base location.
    fn resolve_archive(archive: ArchiveSource) -> Result<ResolvedSource> {
        let names = archive.member_names()?;
        let name = find_description_name(names.iter().map(String::as_str)).ok_or_else(|| {
            RdfError::unreachable(&archive, "archive contains no description file")
        })?;
        let content = archive
            .read_member(&name)?
            .ok_or_else(|| RdfError::unreachable(&archive, format!("cannot read member {name}")))?;
        let origin = format!("{archive}!{name}");
        Ok(ResolvedSource::new(content, BaseLocation::Archive(archive), origin))
    }
}

fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| RdfError::unreachable(dir.display(), err))? {
        let entry = entry.map_err(|err| RdfError::unreachable(dir.display(), err))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::config::ResolverConfig;

    fn resolver() -> SourceResolver {
        SourceResolver::new(RemoteFetcher::new(&ResolverConfig::default(), None).unwrap())
    }

    #[test]
    fn parse_source_arguments() {
        assert!(matches!(SourceRef::parse("https://x.org/rdf.yaml"), SourceRef::Url(_)));
        assert!(matches!(SourceRef::parse("models/rdf.yaml"), SourceRef::Path(_)));
    }

    #[test]
    fn directory_resolves_to_its_description() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rdf.yaml"), "name: x\n").unwrap();
        fs::write(dir.path().join("weights.pt"), "w").unwrap();

        let resolved = resolver().resolve(&dir.path().into()).unwrap();
        assert_eq!(resolved.content, b"name: x\n");
        assert_eq!(
            resolved.root,
            BaseLocation::Directory(std::path::absolute(dir.path()).unwrap())
        );
        assert_eq!(resolved.digest, sha256_hex(b"name: x\n"));
    }

    #[test]
    fn directory_without_description_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolver().resolve(&dir.path().into()).unwrap_err();
        assert!(matches!(err, RdfError::UnreachableSource { .. }));
    }

    #[test]
    fn zip_files_become_archive_roots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.zip");
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("unet.bioimageio.yaml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"name: zipped\n").unwrap();
        writer.start_file("weights/w.pt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"w").unwrap();
        fs::write(&path, writer.finish().unwrap().into_inner()).unwrap();

        let resolver = resolver();
        let resolved = resolver.resolve(&path.as_path().into()).unwrap();
        assert_eq!(resolved.content, b"name: zipped\n");
        assert!(matches!(resolved.root, BaseLocation::Archive(ArchiveSource::File(_))));

        let weights = resolver.open(&"weights/w.pt".into(), &resolved.root).unwrap();
        assert_eq!(weights, b"w");
    }

    #[test]
    fn text_sources_use_the_working_directory() {
        let resolved = resolver().resolve(&SourceRef::Text("name: t\n".into())).unwrap();
        assert_eq!(resolved.root, BaseLocation::current_dir().unwrap());
        assert_eq!(resolved.origin, "<text>");
    }

    #[test]
    fn missing_paths_are_unreachable() {
        let err = resolver()
            .resolve(&SourceRef::Path(PathBuf::from("/definitely/not/here.yaml")))
            .unwrap_err();
        assert!(matches!(err, RdfError::UnreachableSource { .. }));
    }
}

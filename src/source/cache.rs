//! Content-addressed cache for remote fetches.
//!
//! Layout under the cache root:
//!
//! - `blobs/<sha256>`: downloaded bytes, named by their digest
//! - `urls/<sha256(url)>.json`: index entry mapping a URL to its blob
//! - `.lock`: exclusive lock held for every read-modify-write

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{RdfError, Result};

/// Lowercase hex sha256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Index record for one cached URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub sha256: String,
    pub size: u64,
    pub fetched_at: DateTime<Utc>,
}

pub struct FetchCache {
    root: PathBuf,
}

impl FetchCache {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [root.join("blobs"), root.join("urls")] {
            fs::create_dir_all(&dir).map_err(|err| {
                RdfError::Cache(format!("create cache dir {}: {err}", dir.display()))
            })?;
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached bytes for `url`. Entries whose blob is missing or fails
    /// digest verification are evicted and reported as a miss.
    pub fn get(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let _lock = self.lock()?;
        let index_path = self.index_path(url);
        let Some(entry) = self.read_index(&index_path)? else {
            return Ok(None);
        };

        let blob_path = self.blob_path(&entry.sha256);
        let bytes = match fs::read(&blob_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(url = %url, "cached blob missing, dropping index entry");
                remove_if_exists(&index_path)?;
                return Ok(None);
            }
            Err(err) => {
                return Err(RdfError::Cache(format!(
                    "read blob {}: {err}",
                    blob_path.display()
                )));
            }
        };

        if sha256_hex(&bytes) != entry.sha256 {
            warn!(url = %url, expected = %entry.sha256, "cached blob digest mismatch, evicting");
            remove_if_exists(&blob_path)?;
            remove_if_exists(&index_path)?;
            return Ok(None);
        }

        debug!(url = %url, sha256 = %entry.sha256, "fetch cache hit");
        Ok(Some(bytes))
    }

    /// Store `bytes` as the content of `url`.
    pub fn put(&self, url: &Url, bytes: &[u8]) -> Result<CacheEntry> {
        let _lock = self.lock()?;
        let sha256 = sha256_hex(bytes);
        let blob_path = self.blob_path(&sha256);
        if !blob_path.exists() {
            write_atomic(&blob_path, bytes)?;
        }

        let entry = CacheEntry {
            url: url.to_string(),
            sha256,
            size: bytes.len() as u64,
            fetched_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&self.index_path(url), &json)?;
        debug!(url = %url, sha256 = %entry.sha256, size = entry.size, "cached remote source");
        Ok(entry)
    }

    /// All index entries, sorted by URL.
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        let _lock = self.lock()?;
        let mut entries = Vec::new();
        for path in self.index_files()? {
            if let Some(entry) = self.read_index(&path)? {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(entries)
    }

    /// Drop the entry for `url`. The blob goes too unless another URL
    /// shares it. Returns whether an entry existed.
    pub fn evict(&self, url: &Url) -> Result<bool> {
        let _lock = self.lock()?;
        let index_path = self.index_path(url);
        let Some(entry) = self.read_index(&index_path)? else {
            return Ok(false);
        };
        remove_if_exists(&index_path)?;

        let mut shared = false;
        for path in self.index_files()? {
            if let Some(other) = self.read_index(&path)? {
                if other.sha256 == entry.sha256 {
                    shared = true;
                    break;
                }
            }
        }
        if !shared {
            remove_if_exists(&self.blob_path(&entry.sha256))?;
        }
        Ok(true)
    }

    /// Remove every entry and blob. Returns the number of URLs dropped.
    pub fn clear(&self) -> Result<usize> {
        let _lock = self.lock()?;
        let index_files = self.index_files()?;
        let count = index_files.len();
        for path in index_files {
            remove_if_exists(&path)?;
        }
        let blobs = self.root.join("blobs");
        for entry in read_dir(&blobs)? {
            remove_if_exists(&entry)?;
        }
        Ok(count)
    }

    fn lock(&self) -> Result<CacheLock> {
        let path = self.root.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|err| RdfError::Cache(format!("open lock {}: {err}", path.display())))?;
        FileExt::lock_exclusive(&file)
            .map_err(|err| RdfError::Cache(format!("lock {}: {err}", path.display())))?;
        Ok(CacheLock { file })
    }

    fn read_index(&self, path: &Path) -> Result<Option<CacheEntry>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RdfError::Cache(format!(
                    "read index {}: {err}",
                    path.display()
                )));
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "corrupt cache index entry, removing");
                remove_if_exists(path)?;
                Ok(None)
            }
        }
    }

    fn index_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = read_dir(&self.root.join("urls"))?
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn index_path(&self, url: &Url) -> PathBuf {
        self.root
            .join("urls")
            .join(format!("{}.json", sha256_hex(url.as_str().as_bytes())))
    }

    fn blob_path(&self, sha256: &str) -> PathBuf {
        self.root.join("blobs").join(sha256)
    }
}

struct CacheLock {
    file: File,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| RdfError::Cache(format!("no parent for {}", path.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|err| RdfError::Cache(format!("temp file in {}: {err}", dir.display())))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|err| RdfError::Cache(format!("write {}: {err}", path.display())))?;
    tmp.persist(path)
        .map_err(|err| RdfError::Cache(format!("persist {}: {}", path.display(), err.error)))?;
    Ok(())
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(RdfError::Cache(format!("read dir {}: {err}", dir.display())));
        }
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|err| RdfError::Cache(format!("read dir {}: {err}", dir.display())))?;
        let path = entry.path();
        if path.is_file() {
            out.push(path);
        }
    }
    Ok(out)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(RdfError::Cache(format!("remove {}: {err}", path.display()))),
    }
}

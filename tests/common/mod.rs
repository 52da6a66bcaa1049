//! Helpers shared by the integration suites.

#![allow(dead_code)]

use std::io::Read;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

#[path = "../../src/test_utils/fixtures.rs"]
mod fixtures;

pub use fixtures::{DescriptionFixture, MINIMAL_MODEL_V04, MINIMAL_MODEL_V05};

/// A scratch area with an empty config file and a private fetch cache, so
/// runs never see the user's configuration.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PathBuf,
    pub cache: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();
        let cache = dir.path().join("cache");
        Self { dir, config, cache }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// The binary, isolated to this workspace.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("bioimageio").unwrap();
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env("BIOIMAGEIO_CONFIG", &self.config)
            .env("BIOIMAGEIO_CACHE_DIR", &self.cache);
        cmd
    }
}

/// Member names of a zip archive in archive order.
pub fn zip_members(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|idx| archive.by_index(idx).unwrap().name().to_string())
        .collect()
}

/// Text of one zip member.
pub fn zip_text(path: &Path, member: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut text = String::new();
    archive
        .by_name(member)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}

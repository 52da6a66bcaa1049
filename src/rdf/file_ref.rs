//! References from a description to other files.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// A file named by a description: an absolute URL or a path relative to the
/// description's base location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileReference {
    Url(Url),
    Path(String),
}

impl FileReference {
    /// Last path component, used to name the file inside a package.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        let tail = match self {
            Self::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(ToString::to_string),
            Self::Path(path) => path
                .replace('\\', "/")
                .rsplit('/')
                .next()
                .map(ToString::to_string),
        };
        tail.filter(|name| !name.is_empty() && name != "." && name != "..")
    }

    #[must_use]
    pub const fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl From<String> for FileReference {
    fn from(raw: String) -> Self {
        if !raw.contains("://") {
            return Self::Path(raw);
        }
        Url::parse(&raw).map_or(Self::Path(raw), Self::Url)
    }
}

impl From<&str> for FileReference {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<FileReference> for String {
    fn from(reference: FileReference) -> Self {
        reference.to_string()
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_paths_are_told_apart() {
        assert!(FileReference::from("https://example.com/w.pt").is_url());
        assert!(!FileReference::from("weights/w.pt").is_url());
        assert!(!FileReference::from("not a url://").is_url());
    }

    #[test]
    fn file_names() {
        assert_eq!(
            FileReference::from("https://example.com/a/b/w.pt").file_name(),
            Some("w.pt".to_string())
        );
        assert_eq!(
            FileReference::from("sub\\dir\\input.npy").file_name(),
            Some("input.npy".to_string())
        );
        assert_eq!(FileReference::from("a/..").file_name(), None);
    }
}

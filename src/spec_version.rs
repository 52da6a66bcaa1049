//! Supported schema versions and the pinned specification release.
//!
//! The pinned version is the specification release this crate was built
//! against. It caps the `format_version` a description may declare; callers
//! that track a different release pass their own [`VersionPolicy`].

use std::fmt;

use semver::Version;

use crate::error::{RdfError, Result};

/// Specification release this crate implements.
pub const PINNED_SPEC_VERSION: &str = "0.5.3";

/// Oldest `format_version` still accepted. Descriptions without a
/// `format_version` are read as this version.
pub const OLDEST_FORMAT_VERSION: Version = Version::new(0, 4, 0);

/// Newest `format_version` this crate has rules for.
pub const NEWEST_FORMAT_VERSION: Version = Version::new(0, 5, 3);

/// Schema revision a format version belongs to. Selects field names,
/// emission order and validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Revision {
    V0_4,
    V0_5,
}

impl Revision {
    #[must_use]
    pub const fn of(version: &Version) -> Option<Self> {
        match (version.major, version.minor) {
            (0, 4) => Some(Self::V0_4),
            (0, 5) => Some(Self::V0_5),
            _ => None,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V0_4 => write!(f, "0.4"),
            Self::V0_5 => write!(f, "0.5"),
        }
    }
}

/// Window of accepted format versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    pub oldest: Version,
    pub ceiling: Version,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        // The constant is a literal; a parse failure here is a build defect.
        let pinned = Version::parse(PINNED_SPEC_VERSION).unwrap_or(NEWEST_FORMAT_VERSION);
        Self::pinned_to(&pinned)
    }
}

impl VersionPolicy {
    /// Policy whose ceiling is the pinned release, clamped to the newest
    /// version this crate has rules for.
    #[must_use]
    pub fn pinned_to(pinned: &Version) -> Self {
        let pinned = release_triple(pinned);
        let ceiling = if pinned < NEWEST_FORMAT_VERSION {
            pinned
        } else {
            NEWEST_FORMAT_VERSION
        };
        Self {
            oldest: OLDEST_FORMAT_VERSION,
            ceiling,
        }
    }

    /// Build a policy from a pin string such as `0.5.3` or `0.5.3.2`.
    pub fn from_pin(pin: &str) -> Result<Self> {
        let pinned = parse_loose_version(pin)
            .ok_or_else(|| RdfError::Config(format!("invalid pinned spec version '{pin}'")))?;
        if pinned < OLDEST_FORMAT_VERSION {
            return Err(RdfError::Config(format!(
                "pinned spec version {pinned} is older than the oldest supported format {OLDEST_FORMAT_VERSION}"
            )));
        }
        Ok(Self::pinned_to(&pinned))
    }

    #[must_use]
    pub fn accepts(&self, version: &Version) -> bool {
        let version = release_triple(version);
        version >= self.oldest && version <= self.ceiling
    }
}

/// Highest `format_version` accepted under the default pin.
#[must_use]
pub fn max_supported_format_version() -> Version {
    VersionPolicy::default().ceiling
}

/// Result of comparing the pinned specification against the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinCheck {
    pub pinned: Version,
    pub released: Version,
}

impl PinCheck {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.pinned >= self.released
    }
}

/// Compare a pin against the latest released specification on
/// major.minor.patch only. Fails when the pin is stale.
pub fn check_release_pin(pinned: &str, released: &str) -> Result<PinCheck> {
    let parse = |label: &str, value: &str| {
        parse_loose_version(value)
            .ok_or_else(|| RdfError::Config(format!("invalid {label} version '{value}'")))
    };
    let check = PinCheck {
        pinned: parse("pinned", pinned)?,
        released: parse("released", released)?,
    };
    if check.is_current() {
        Ok(check)
    } else {
        Err(RdfError::Config(format!(
            "spec pinned to an old version: pinned {} < released {}",
            check.pinned, check.released
        )))
    }
}

/// Parse `X.Y`, `X.Y.Z` and `X.Y.Z.N...` version strings down to a semver
/// release triple. Extra numeric components (package build numbers) and
/// wildcard suffixes such as `.*` are ignored.
#[must_use]
pub fn parse_loose_version(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(raw) {
        return Some(release_triple(&version));
    }
    let mut parts = raw.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next()?.parse::<u64>().ok()?;
    let patch = match parts.next() {
        None | Some("*") => 0,
        Some(value) => value.parse::<u64>().ok()?,
    };
    Some(Version::new(major, minor, patch))
}

fn release_triple(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceiling_matches_pin() {
        assert_eq!(max_supported_format_version(), Version::new(0, 5, 3));
    }

    #[test]
    fn pin_above_known_versions_is_clamped() {
        let policy = VersionPolicy::from_pin("0.9.0").unwrap();
        assert_eq!(policy.ceiling, NEWEST_FORMAT_VERSION);
    }

    #[test]
    fn older_pin_lowers_ceiling() {
        let policy = VersionPolicy::from_pin("0.4.10").unwrap();
        assert!(policy.accepts(&Version::new(0, 4, 9)));
        assert!(!policy.accepts(&Version::new(0, 5, 0)));
    }

    #[test]
    fn loose_versions() {
        assert_eq!(parse_loose_version("0.4"), Some(Version::new(0, 4, 0)));
        assert_eq!(parse_loose_version("0.5.3.2"), Some(Version::new(0, 5, 3)));
        assert_eq!(parse_loose_version("0.4.9.*"), Some(Version::new(0, 4, 9)));
        assert_eq!(parse_loose_version("latest"), None);
    }

    #[test]
    fn stale_pin_is_rejected() {
        assert!(check_release_pin("0.5.3", "0.5.3").is_ok());
        assert!(check_release_pin("0.5.4.1", "0.5.3").is_ok());
        let err = check_release_pin("0.5.2", "0.5.3").unwrap_err();
        assert!(err.to_string().contains("old version"));
    }

    #[test]
    fn revisions() {
        assert_eq!(Revision::of(&Version::new(0, 4, 7)), Some(Revision::V0_4));
        assert_eq!(Revision::of(&Version::new(0, 5, 0)), Some(Revision::V0_5));
        assert_eq!(Revision::of(&Version::new(0, 3, 6)), None);
    }
}

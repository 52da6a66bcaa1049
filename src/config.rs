use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RdfError, Result};
use crate::lint::{Severity, ValidationConfig};
use crate::spec_version::{PINNED_SPEC_VERSION, VersionPolicy};

/// File name of the per-project configuration layer.
pub const PROJECT_CONFIG_FILE: &str = "bioimageio.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub spec: SpecConfig,
}

impl Config {
    /// Layer defaults, the global file, the project file and `BIOIMAGEIO_*`
    /// environment overrides. An explicit path (argument or
    /// `BIOIMAGEIO_CONFIG`) replaces both file layers.
    pub fn load(explicit_path: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok();
        Self::load_with(explicit_path, project_dir, Self::global_path(), &lookup)
    }

    fn load_with(
        explicit_path: Option<&Path>,
        project_dir: &Path,
        global_path: Option<PathBuf>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| lookup("BIOIMAGEIO_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(RdfError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = global_path {
                if let Some(patch) = Self::load_patch(&global)? {
                    config.merge_patch(patch);
                }
            }
            if let Some(project) = Self::load_patch(&project_dir.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(project);
            }
        }

        config.apply_overrides_from(lookup)?;
        config.check()?;

        Ok(config)
    }

    /// Path of the global configuration file, when a config directory exists.
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bioimageio/config.toml"))
    }

    /// Version window derived from the pinned spec release.
    pub fn version_policy(&self) -> Result<VersionPolicy> {
        VersionPolicy::from_pin(&self.spec.pinned_version)
    }

    /// Directory of the fetch cache.
    #[must_use]
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache
            .dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("bioimageio/fetch")))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| RdfError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| RdfError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.resolver {
            self.resolver.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
        if let Some(patch) = patch.validation {
            self.validation.merge(patch);
        }
        if let Some(patch) = patch.package {
            self.package.merge(patch);
        }
        if let Some(patch) = patch.spec {
            self.spec.merge(patch);
        }
    }

    fn apply_overrides_from(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        let env = Env(lookup);

        if let Some(value) = env.u64("BIOIMAGEIO_TIMEOUT_SECS")? {
            self.resolver.timeout_secs = value;
        }
        if let Some(value) = env.string("BIOIMAGEIO_USER_AGENT") {
            self.resolver.user_agent = value;
        }
        if let Some(value) = env.bool("BIOIMAGEIO_OFFLINE") {
            self.resolver.offline = value;
        }

        if let Some(value) = env.bool("BIOIMAGEIO_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if env.bool("BIOIMAGEIO_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(value) = env.string("BIOIMAGEIO_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(value));
        }

        if let Some(value) = env.bool("BIOIMAGEIO_VALIDATION_STRICT") {
            self.validation.strict = value;
        }
        if let Some(values) = env.list("BIOIMAGEIO_VALIDATION_DISABLED_RULES") {
            self.validation.disabled_rules =
                merge_unique(values, &self.validation.disabled_rules);
        }
        if let Some(value) = env.u64("BIOIMAGEIO_VALIDATION_MAX_ERRORS")? {
            self.validation.max_errors = usize::try_from(value).ok();
        }

        if let Some(value) = env.bool("BIOIMAGEIO_PACKAGE_OVERWRITE") {
            self.package.overwrite = value;
        }
        if let Some(value) = env.bool("BIOIMAGEIO_PACKAGE_REQUIRE_VALID") {
            self.package.require_valid = value;
        }
        if let Some(value) = env.string("BIOIMAGEIO_PACKAGE_COMPRESSION") {
            self.package.compression = parse_compression(&value)?;
        }

        if let Some(value) = env.string("BIOIMAGEIO_SPEC_PINNED_VERSION") {
            self.spec.pinned_version = value;
        }

        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.resolver.timeout_secs == 0 {
            return Err(RdfError::Config(
                "resolver.timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.version_policy().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound for a single HTTP request.
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: String,
    /// Serve remote sources from the fetch cache only.
    #[serde(default)]
    pub offline: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("bioimageio-core/", env!("CARGO_PKG_VERSION")).to_string(),
            offline: false,
        }
    }
}

impl ResolverConfig {
    fn merge(&mut self, patch: ResolverPatch) {
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
        if let Some(value) = patch.user_agent {
            self.user_agent = value;
        }
        if let Some(value) = patch.offline {
            self.offline = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Defaults to `<cache dir>/bioimageio/fetch`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.dir {
            self.dir = Some(value);
        }
    }
}

/// The `[validation]` section; see [`ValidationConfig`] for semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    #[serde(default)]
    pub severity_overrides: BTreeMap<String, Severity>,
    #[serde(default)]
    pub max_errors: Option<usize>,
}

impl ValidationSettings {
    fn merge(&mut self, patch: ValidationPatch) {
        if let Some(value) = patch.strict {
            self.strict = value;
        }
        if let Some(values) = patch.disabled_rules {
            self.disabled_rules = merge_unique(values, &self.disabled_rules);
        }
        if let Some(values) = patch.severity_overrides {
            self.severity_overrides.extend(values);
        }
        if let Some(value) = patch.max_errors {
            self.max_errors = Some(value);
        }
    }

    #[must_use]
    pub fn to_validation_config(&self) -> ValidationConfig {
        let mut config = ValidationConfig::new();
        config.strict = self.strict;
        config.max_errors = self.max_errors;
        for rule in &self.disabled_rules {
            config = config.disable_rule(rule.clone());
        }
        for (rule, severity) in &self.severity_overrides {
            config = config.override_severity(rule.clone(), *severity);
        }
        config
    }
}

/// Entry compression inside packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Replace an existing archive at the target path.
    #[serde(default)]
    pub overwrite: bool,
    /// Refuse to package descriptions that fail validation.
    #[serde(default)]
    pub require_valid: bool,
    #[serde(default)]
    pub compression: Compression,
}

impl PackageConfig {
    fn merge(&mut self, patch: PackagePatch) {
        if let Some(value) = patch.overwrite {
            self.overwrite = value;
        }
        if let Some(value) = patch.require_valid {
            self.require_valid = value;
        }
        if let Some(value) = patch.compression {
            self.compression = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecConfig {
    /// Specification release that caps accepted `format_version`s.
    #[serde(default)]
    pub pinned_version: String,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            pinned_version: PINNED_SPEC_VERSION.to_string(),
        }
    }
}

impl SpecConfig {
    fn merge(&mut self, patch: SpecPatch) {
        if let Some(value) = patch.pinned_version {
            self.pinned_version = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub resolver: Option<ResolverPatch>,
    pub cache: Option<CachePatch>,
    pub validation: Option<ValidationPatch>,
    pub package: Option<PackagePatch>,
    pub spec: Option<SpecPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResolverPatch {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub offline: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ValidationPatch {
    pub strict: Option<bool>,
    pub disabled_rules: Option<Vec<String>>,
    pub severity_overrides: Option<BTreeMap<String, Severity>>,
    pub max_errors: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PackagePatch {
    pub overwrite: Option<bool>,
    pub require_valid: Option<bool>,
    pub compression: Option<Compression>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SpecPatch {
    pub pinned_version: Option<String>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn parse_compression(value: &str) -> Result<Compression> {
    match value.to_lowercase().as_str() {
        "deflated" | "deflate" => Ok(Compression::Deflated),
        "stored" | "none" => Ok(Compression::Stored),
        _ => Err(RdfError::Config(format!(
            "invalid compression {value} (expected deflated|stored)"
        ))),
    }
}

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.string(key)
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }

    fn u64(&self, key: &str) -> Result<Option<u64>> {
        match self.string(key) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|err| RdfError::Config(format!("invalid {key} value {value}: {err}"))),
            None => Ok(None),
        }
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.string(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.resolver.timeout_secs, 30);
        assert!(config.cache.enabled);
        assert!(!config.package.overwrite);
        assert_eq!(config.spec.pinned_version, PINNED_SPEC_VERSION);
        assert_eq!(config.package.compression, Compression::Deflated);
    }

    #[test]
    fn project_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[resolver]\ntimeout_secs = 5\n\n[validation]\nstrict = true\ndisabled_rules = [\"name-length\"]\n",
        )
        .unwrap();
        let config = Config::load_with(None, dir.path(), None, &env(&[])).unwrap();
        assert_eq!(config.resolver.timeout_secs, 5);
        assert!(config.validation.strict);
        assert_eq!(config.validation.disabled_rules, vec!["name-length"]);
        // untouched sections keep their defaults
        assert!(config.cache.enabled);
    }

    #[test]
    fn explicit_path_replaces_file_layers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[resolver]\ntimeout_secs = 5\n",
        )
        .unwrap();
        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[package]\noverwrite = true\n").unwrap();

        let config = Config::load_with(Some(&explicit), dir.path(), None, &env(&[])).unwrap();
        assert_eq!(config.resolver.timeout_secs, 30);
        assert!(config.package.overwrite);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load_with(Some(&missing), dir.path(), None, &env(&[])).unwrap_err();
        assert!(matches!(err, RdfError::Config(_)));
    }

    #[test]
    fn env_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(
            None,
            dir.path(),
            None,
            &env(&[
                ("BIOIMAGEIO_TIMEOUT_SECS", "7"),
                ("BIOIMAGEIO_CACHE_DISABLED", "yes"),
                ("BIOIMAGEIO_VALIDATION_DISABLED_RULES", "axes, name-length"),
                ("BIOIMAGEIO_PACKAGE_COMPRESSION", "stored"),
            ]),
        )
        .unwrap();
        assert_eq!(config.resolver.timeout_secs, 7);
        assert!(!config.cache.enabled);
        assert_eq!(config.validation.disabled_rules, vec!["axes", "name-length"]);
        assert_eq!(config.package.compression, Compression::Stored);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for pairs in [
            [("BIOIMAGEIO_TIMEOUT_SECS", "soon")],
            [("BIOIMAGEIO_TIMEOUT_SECS", "0")],
            [("BIOIMAGEIO_SPEC_PINNED_VERSION", "0.2.0")],
            [("BIOIMAGEIO_PACKAGE_COMPRESSION", "bzip")],
        ] {
            let err = Config::load_with(None, dir.path(), None, &env(&pairs)).unwrap_err();
            assert!(matches!(err, RdfError::Config(_)), "{pairs:?}");
        }
    }

    #[test]
    fn validation_settings_convert() {
        let settings = ValidationSettings {
            strict: true,
            disabled_rules: vec!["axes".to_string()],
            severity_overrides: BTreeMap::from([("name-length".to_string(), Severity::Error)]),
            max_errors: Some(3),
        };
        let config = settings.to_validation_config();
        assert!(config.strict);
        assert!(config.is_rule_disabled("axes"));
        assert_eq!(
            config.effective_severity("name-length", Severity::Warning),
            Severity::Error
        );
        assert_eq!(config.max_errors, Some(3));
    }
}

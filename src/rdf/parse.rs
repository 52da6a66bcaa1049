//! Bytes to [`ResourceDescription`].

use semver::Version;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::model::ResourceDescription;
use super::slot::Slot;
use crate::error::{RdfError, Result};
use crate::source::BaseLocation;
use crate::spec_version::{VersionPolicy, parse_loose_version};

/// Parses description documents under a fixed version policy.
#[derive(Debug, Clone, Default)]
pub struct DescriptionParser {
    policy: VersionPolicy,
}

impl DescriptionParser {
    #[must_use]
    pub const fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Parse YAML (or JSON) bytes. `origin` names the source in errors.
    pub fn parse(
        &self,
        content: &[u8],
        root: BaseLocation,
        origin: &str,
    ) -> Result<ResourceDescription> {
        let text = std::str::from_utf8(content).map_err(|err| {
            let prefix = &content[..err.valid_up_to()];
            let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
            let column = prefix.iter().rev().take_while(|b| **b != b'\n').count() + 1;
            RdfError::MalformedDescription {
                origin: origin.to_string(),
                line,
                column,
                message: "content is not valid UTF-8".to_string(),
            }
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let document: Value = serde_yaml::from_str(text).map_err(|err| {
            let (line, column) = err
                .location()
                .map_or((0, 0), |loc| (loc.line(), loc.column()));
            RdfError::MalformedDescription {
                origin: origin.to_string(),
                line,
                column,
                message: err.to_string(),
            }
        })?;
        self.parse_value(document, root, origin)
    }

    /// Build a description from an already decoded YAML document.
    pub fn parse_value(
        &self,
        document: Value,
        root: BaseLocation,
        origin: &str,
    ) -> Result<ResourceDescription> {
        let mut map = match document {
            Value::Mapping(map) => map,
            other => {
                return Err(RdfError::MalformedDescription {
                    origin: origin.to_string(),
                    line: 1,
                    column: 1,
                    message: format!(
                        "description root must be a mapping, found {}",
                        kind_of(&other)
                    ),
                });
            }
        };

        let (format_version, declared) = self.format_version(map.remove("format_version"), origin)?;
        debug!(%format_version, declared, origin, "parsing description");

        let mut rd = ResourceDescription::new(format_version, root);
        rd.format_version_declared = declared;
        rd.kind = take(&mut map, "type", "string");
        rd.id = take(&mut map, "id", "string");
        rd.name = take(&mut map, "name", "string");
        rd.description = take(&mut map, "description", "string");
        rd.version = take(&mut map, "version", "version");
        rd.license = take(&mut map, "license", "string");
        rd.tags = take(&mut map, "tags", "list of strings");
        rd.authors = take(&mut map, "authors", "list of authors");
        rd.maintainers = take(&mut map, "maintainers", "list of maintainers");
        rd.cite = take(&mut map, "cite", "list of citation entries");
        rd.documentation = take(&mut map, "documentation", "file reference");
        rd.covers = take(&mut map, "covers", "list of file references");
        rd.attachments = take(&mut map, "attachments", "attachments");
        rd.git_repo = take(&mut map, "git_repo", "string");
        rd.inputs = take(&mut map, "inputs", "list of tensor descriptions");
        rd.outputs = take(&mut map, "outputs", "list of tensor descriptions");
        rd.test_inputs = take(&mut map, "test_inputs", "list of file references");
        rd.test_outputs = take(&mut map, "test_outputs", "list of file references");
        rd.sample_inputs = take(&mut map, "sample_inputs", "list of file references");
        rd.sample_outputs = take(&mut map, "sample_outputs", "list of file references");
        rd.weights = take(&mut map, "weights", "mapping of weights formats");
        rd.config = take(&mut map, "config", "mapping");

        for (key, value) in map {
            rd.unrecognized.insert(key_string(&key), value);
        }
        Ok(rd)
    }

    fn format_version(&self, raw: Option<Value>, origin: &str) -> Result<(Version, bool)> {
        let Some(raw) = raw else {
            return Ok((self.policy.oldest.clone(), false));
        };
        let found = match &raw {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            other => serde_yaml::to_string(other)
                .map_or_else(|_| "<unprintable>".to_string(), |s| s.trim().to_string()),
        };
        let unsupported = || RdfError::UnsupportedVersion {
            origin: origin.to_string(),
            found: found.clone(),
            oldest: self.policy.oldest.to_string(),
            newest: self.policy.ceiling.to_string(),
        };
        let version = match raw {
            Value::String(_) | Value::Number(_) => parse_loose_version(&found),
            _ => None,
        }
        .ok_or_else(unsupported)?;
        if !self.policy.accepts(&version) {
            return Err(unsupported());
        }
        Ok((version, true))
    }
}

fn take<T: DeserializeOwned>(map: &mut Mapping, key: &str, expected: &'static str) -> Slot<T> {
    Slot::from_raw(map.remove(key), expected)
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| format!("{other:?}"), |s| s.trim().to_string()),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "an empty document",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

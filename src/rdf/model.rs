//! Typed resource description tree.
//!
//! Known fields live in [`Slot`]s; everything else is retained in
//! `unrecognized` (top level) or an `extra` map (nested structures) so that a
//! description survives a read/write cycle without losing content.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::file_ref::FileReference;
use super::slot::Slot;
use crate::error::Result;
use crate::source::BaseLocation;
use crate::spec_version::Revision;

pub type Extra = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiteEntry {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A file with an optional content digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescr {
    pub source: FileReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl FileDescr {
    #[must_use]
    pub fn new(source: impl Into<FileReference>) -> Self {
        Self {
            source: source.into(),
            sha256: None,
            extra: Extra::new(),
        }
    }
}

/// `attachments` is `{files: [...]}` in 0.4 and a list of files in 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachments {
    Files(Vec<FileDescr>),
    Legacy(LegacyAttachments),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyAttachments {
    #[serde(default)]
    pub files: Vec<FileReference>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Network architecture of a state-dict weights entry. 0.4 names it as
/// `path/to/module.py:ClassName` (or an importable `package.module.Class`);
/// 0.5 uses `{source, callable}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Architecture {
    Source(ArchitectureSource),
    Callable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSource {
    pub source: FileReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Architecture {
    /// File part of a 0.4 `file.py:Callable` string, if it names one.
    #[must_use]
    pub fn legacy_file(&self) -> Option<(&str, &str)> {
        let Self::Callable(spec) = self else {
            return None;
        };
        let (file, callable) = spec.rsplit_once(':')?;
        file.ends_with(".py").then_some((file, callable))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsEntry {
    pub source: FileReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl WeightsEntry {
    #[must_use]
    pub fn new(source: impl Into<FileReference>) -> Self {
        Self {
            source: source.into(),
            sha256: None,
            architecture: None,
            extra: Extra::new(),
        }
    }
}

/// Weights formats recognized by 0.4 and 0.5 model descriptions.
pub const WEIGHTS_FORMATS: &[&str] = &[
    "keras_hdf5",
    "onnx",
    "pytorch_state_dict",
    "tensorflow_js",
    "tensorflow_saved_model_bundle",
    "torchscript",
];

/// `axes` is a letter string in 0.4 and a list of axis objects in 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Axes {
    Letters(String),
    List(Vec<AxisDescr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescr {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<AxisSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_names: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Axis types of 0.5 tensors.
pub const AXIS_TYPES: &[&str] = &["batch", "channel", "index", "time", "space"];

impl AxisDescr {
    /// The axis id, falling back to the id implied by the axis type.
    #[must_use]
    pub fn effective_id(&self) -> Option<&str> {
        self.id.as_deref().or(match self.kind.as_str() {
            "batch" => Some("batch"),
            "channel" => Some("channel"),
            "index" => Some("index"),
            "time" => Some("time"),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSize {
    Fixed(i64),
    Parameterized(ParameterizedSize),
    Reference(SizeReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterizedSize {
    pub min: i64,
    pub step: i64,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeReference {
    pub tensor_id: String,
    pub axis_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// 0.4 tensor shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Shape {
    Explicit(Vec<i64>),
    Parameterized(ParameterizedShape),
    Implicit(ImplicitShape),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterizedShape {
    pub min: Vec<i64>,
    pub step: Vec<i64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitShape {
    pub reference_tensor: String,
    pub scale: Vec<f64>,
    pub offset: Vec<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Shape {
    /// Number of dimensions this shape declares.
    #[must_use]
    pub fn rank(&self) -> usize {
        match self {
            Self::Explicit(dims) => dims.len(),
            Self::Parameterized(shape) => shape.min.len(),
            Self::Implicit(shape) => shape.scale.len(),
        }
    }
}

/// An input or output tensor of either revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDescr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Axes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_range: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_tensor: Option<FileDescr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_tensor: Option<FileDescr>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TensorDescr {
    /// Identifier under the given revision: `name` in 0.4, `id` in 0.5.
    #[must_use]
    pub fn identity(&self, revision: Revision) -> Option<&str> {
        match revision {
            Revision::V0_4 => self.name.as_deref(),
            Revision::V0_5 => self.id.as_deref(),
        }
    }
}

/// A parsed resource description.
#[derive(Debug, Clone)]
pub struct ResourceDescription {
    pub format_version: Version,
    /// `false` when `format_version` was missing and defaulted.
    pub format_version_declared: bool,
    pub kind: Slot<String>,
    pub id: Slot<String>,
    pub name: Slot<String>,
    pub description: Slot<String>,
    pub version: Slot<Value>,
    pub license: Slot<String>,
    pub tags: Slot<Vec<String>>,
    pub authors: Slot<Vec<Author>>,
    pub maintainers: Slot<Vec<Author>>,
    pub cite: Slot<Vec<CiteEntry>>,
    pub documentation: Slot<FileReference>,
    pub covers: Slot<Vec<FileReference>>,
    pub attachments: Slot<Attachments>,
    pub git_repo: Slot<String>,
    pub inputs: Slot<Vec<TensorDescr>>,
    pub outputs: Slot<Vec<TensorDescr>>,
    pub test_inputs: Slot<Vec<FileReference>>,
    pub test_outputs: Slot<Vec<FileReference>>,
    pub sample_inputs: Slot<Vec<FileReference>>,
    pub sample_outputs: Slot<Vec<FileReference>>,
    pub weights: Slot<BTreeMap<String, WeightsEntry>>,
    pub config: Slot<Value>,
    /// Top-level keys this crate does not model, kept for re-emission.
    pub unrecognized: BTreeMap<String, Value>,
    /// Where relative references are resolved from.
    pub root: BaseLocation,
}

/// Known top-level keys in parse order.
pub const KNOWN_FIELDS: &[&str] = &[
    "type",
    "id",
    "name",
    "description",
    "version",
    "license",
    "tags",
    "authors",
    "maintainers",
    "cite",
    "documentation",
    "covers",
    "attachments",
    "git_repo",
    "inputs",
    "outputs",
    "test_inputs",
    "test_outputs",
    "sample_inputs",
    "sample_outputs",
    "weights",
    "config",
];

/// Schema fields that are carried through verbatim in `unrecognized`
/// without being flagged.
pub const PASSTHROUGH_FIELDS: &[&str] = &[
    "badges",
    "download_url",
    "icon",
    "id_emoji",
    "links",
    "packaged_by",
    "parent",
    "run_mode",
    "source",
    "timestamp",
    "training_data",
    "uploader",
];

impl ResourceDescription {
    /// An empty description of the given version rooted at `root`.
    #[must_use]
    pub fn new(format_version: Version, root: BaseLocation) -> Self {
        Self {
            format_version,
            format_version_declared: true,
            kind: Slot::Absent,
            id: Slot::Absent,
            name: Slot::Absent,
            description: Slot::Absent,
            version: Slot::Absent,
            license: Slot::Absent,
            tags: Slot::Absent,
            authors: Slot::Absent,
            maintainers: Slot::Absent,
            cite: Slot::Absent,
            documentation: Slot::Absent,
            covers: Slot::Absent,
            attachments: Slot::Absent,
            git_repo: Slot::Absent,
            inputs: Slot::Absent,
            outputs: Slot::Absent,
            test_inputs: Slot::Absent,
            test_outputs: Slot::Absent,
            sample_inputs: Slot::Absent,
            sample_outputs: Slot::Absent,
            weights: Slot::Absent,
            config: Slot::Absent,
            unrecognized: BTreeMap::new(),
            root,
        }
    }

    /// Schema revision selected by `format_version`.
    #[must_use]
    pub fn revision(&self) -> Revision {
        Revision::of(&self.format_version).unwrap_or(Revision::V0_5)
    }

    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.kind.value().map(String::as_str)
    }

    #[must_use]
    pub fn is_model(&self) -> bool {
        self.resource_type() == Some("model")
    }

    /// Emitted value of a known field.
    pub fn field_yaml(&self, key: &str) -> Result<Option<Value>> {
        match key {
            "format_version" => Ok(Some(Value::String(self.format_version.to_string()))),
            "type" => self.kind.to_yaml(),
            "id" => self.id.to_yaml(),
            "name" => self.name.to_yaml(),
            "description" => self.description.to_yaml(),
            "version" => self.version.to_yaml(),
            "license" => self.license.to_yaml(),
            "tags" => self.tags.to_yaml(),
            "authors" => self.authors.to_yaml(),
            "maintainers" => self.maintainers.to_yaml(),
            "cite" => self.cite.to_yaml(),
            "documentation" => self.documentation.to_yaml(),
            "covers" => self.covers.to_yaml(),
            "attachments" => self.attachments.to_yaml(),
            "git_repo" => self.git_repo.to_yaml(),
            "inputs" => self.inputs.to_yaml(),
            "outputs" => self.outputs.to_yaml(),
            "test_inputs" => self.test_inputs.to_yaml(),
            "test_outputs" => self.test_outputs.to_yaml(),
            "sample_inputs" => self.sample_inputs.to_yaml(),
            "sample_outputs" => self.sample_outputs.to_yaml(),
            "weights" => self.weights.to_yaml(),
            "config" => self.config.to_yaml(),
            _ => Ok(self.unrecognized.get(key).cloned()),
        }
    }

    /// Mistyped known fields as `(key, expected, reason)`.
    #[must_use]
    pub fn mistyped_fields(&self) -> Vec<(&'static str, &'static str, &str)> {
        [
            ("type", mistyped(&self.kind)),
            ("id", mistyped(&self.id)),
            ("name", mistyped(&self.name)),
            ("description", mistyped(&self.description)),
            ("version", mistyped(&self.version)),
            ("license", mistyped(&self.license)),
            ("tags", mistyped(&self.tags)),
            ("authors", mistyped(&self.authors)),
            ("maintainers", mistyped(&self.maintainers)),
            ("cite", mistyped(&self.cite)),
            ("documentation", mistyped(&self.documentation)),
            ("covers", mistyped(&self.covers)),
            ("attachments", mistyped(&self.attachments)),
            ("git_repo", mistyped(&self.git_repo)),
            ("inputs", mistyped(&self.inputs)),
            ("outputs", mistyped(&self.outputs)),
            ("test_inputs", mistyped(&self.test_inputs)),
            ("test_outputs", mistyped(&self.test_outputs)),
            ("sample_inputs", mistyped(&self.sample_inputs)),
            ("sample_outputs", mistyped(&self.sample_outputs)),
            ("weights", mistyped(&self.weights)),
            ("config", mistyped(&self.config)),
        ]
        .into_iter()
        .filter_map(|(key, found)| found.map(|(expected, reason)| (key, expected, reason)))
        .collect()
    }

    /// Every file reference in document order, with its field path and role.
    #[must_use]
    pub fn file_references(&self) -> Vec<ReferenceSite> {
        let mut sites = Vec::new();
        let mut push = |field: String, reference: &FileReference, role: FileRole| {
            sites.push(ReferenceSite {
                field,
                reference: reference.clone(),
                role,
            });
        };

        if let Some(doc) = self.documentation.value() {
            push("documentation".to_string(), doc, FileRole::Documentation);
        }
        if let Some(covers) = self.covers.value() {
            for (idx, cover) in covers.iter().enumerate() {
                push(format!("covers[{idx}]"), cover, FileRole::Cover);
            }
        }
        match self.attachments.value() {
            Some(Attachments::Files(files)) => {
                for (idx, file) in files.iter().enumerate() {
                    push(
                        format!("attachments[{idx}].source"),
                        &file.source,
                        FileRole::Attachment,
                    );
                }
            }
            Some(Attachments::Legacy(legacy)) => {
                for (idx, file) in legacy.files.iter().enumerate() {
                    push(format!("attachments.files[{idx}]"), file, FileRole::Attachment);
                }
            }
            None => {}
        }
        for (key, slot) in [("inputs", &self.inputs), ("outputs", &self.outputs)] {
            let Some(tensors) = slot.value() else {
                continue;
            };
            for (idx, tensor) in tensors.iter().enumerate() {
                if let Some(test) = &tensor.test_tensor {
                    push(
                        format!("{key}[{idx}].test_tensor.source"),
                        &test.source,
                        FileRole::TestTensor,
                    );
                }
                if let Some(sample) = &tensor.sample_tensor {
                    push(
                        format!("{key}[{idx}].sample_tensor.source"),
                        &sample.source,
                        FileRole::Sample,
                    );
                }
            }
        }
        for (key, slot, role) in [
            ("test_inputs", &self.test_inputs, FileRole::TestTensor),
            ("test_outputs", &self.test_outputs, FileRole::TestTensor),
            ("sample_inputs", &self.sample_inputs, FileRole::Sample),
            ("sample_outputs", &self.sample_outputs, FileRole::Sample),
        ] {
            if let Some(files) = slot.value() {
                for (idx, file) in files.iter().enumerate() {
                    push(format!("{key}[{idx}]"), file, role);
                }
            }
        }
        if let Some(weights) = self.weights.value() {
            for (format, entry) in weights {
                push(format!("weights.{format}.source"), &entry.source, FileRole::Weights);
                match &entry.architecture {
                    Some(Architecture::Source(arch)) => push(
                        format!("weights.{format}.architecture.source"),
                        &arch.source,
                        FileRole::Weights,
                    ),
                    Some(legacy @ Architecture::Callable(_)) => {
                        if let Some((file, _)) = legacy.legacy_file() {
                            push(
                                format!("weights.{format}.architecture"),
                                &FileReference::from(file),
                                FileRole::Weights,
                            );
                        }
                    }
                    None => {}
                }
            }
        }
        sites
    }

    /// Rewrite every file reference in place. Used on clones by the writer
    /// and the package builder.
    pub(crate) fn map_references<F>(&mut self, mut map: F) -> Result<()>
    where
        F: FnMut(&FileReference) -> Result<FileReference>,
    {
        if let Some(doc) = self.documentation.value_mut() {
            *doc = map(doc)?;
        }
        if let Some(covers) = self.covers.value_mut() {
            for cover in covers.iter_mut() {
                *cover = map(cover)?;
            }
        }
        match self.attachments.value_mut() {
            Some(Attachments::Files(files)) => {
                for file in files.iter_mut() {
                    file.source = map(&file.source)?;
                }
            }
            Some(Attachments::Legacy(legacy)) => {
                for file in &mut legacy.files {
                    *file = map(file)?;
                }
            }
            None => {}
        }
        for slot in [&mut self.inputs, &mut self.outputs] {
            let Some(tensors) = slot.value_mut() else {
                continue;
            };
            for tensor in tensors.iter_mut() {
                if let Some(test) = &mut tensor.test_tensor {
                    test.source = map(&test.source)?;
                }
                if let Some(sample) = &mut tensor.sample_tensor {
                    sample.source = map(&sample.source)?;
                }
            }
        }
        for slot in [
            &mut self.test_inputs,
            &mut self.test_outputs,
            &mut self.sample_inputs,
            &mut self.sample_outputs,
        ] {
            if let Some(files) = slot.value_mut() {
                for file in files.iter_mut() {
                    *file = map(file)?;
                }
            }
        }
        if let Some(weights) = self.weights.value_mut() {
            for entry in weights.values_mut() {
                entry.source = map(&entry.source)?;
                match &mut entry.architecture {
                    Some(Architecture::Source(arch)) => arch.source = map(&arch.source)?,
                    Some(legacy @ Architecture::Callable(_)) => {
                        let rewritten = legacy.legacy_file().map(|(file, callable)| {
                            (FileReference::from(file), callable.to_string())
                        });
                        if let Some((file, callable)) = rewritten {
                            let file = map(&file)?;
                            *legacy = Architecture::Callable(format!("{file}:{callable}"));
                        }
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}

fn mistyped<T>(slot: &Slot<T>) -> Option<(&'static str, &str)> {
    match slot {
        Slot::Mistyped {
            expected, reason, ..
        } => Some((*expected, reason.as_str())),
        _ => None,
    }
}

/// Field-wise equality. The base location and whether `format_version` was
/// defaulted are provenance, not content.
impl PartialEq for ResourceDescription {
    fn eq(&self, other: &Self) -> bool {
        self.format_version == other.format_version
            && self.kind == other.kind
            && self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.version == other.version
            && self.license == other.license
            && self.tags == other.tags
            && self.authors == other.authors
            && self.maintainers == other.maintainers
            && self.cite == other.cite
            && self.documentation == other.documentation
            && self.covers == other.covers
            && self.attachments == other.attachments
            && self.git_repo == other.git_repo
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.test_inputs == other.test_inputs
            && self.test_outputs == other.test_outputs
            && self.sample_inputs == other.sample_inputs
            && self.sample_outputs == other.sample_outputs
            && self.weights == other.weights
            && self.config == other.config
            && self.unrecognized == other.unrecognized
    }
}

/// What a referenced file is for; selects its directory inside a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Description,
    Weights,
    TestTensor,
    Sample,
    Cover,
    Attachment,
    Documentation,
}

impl FileRole {
    /// Package directory for files of this role.
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Description => "",
            Self::Weights => "weights",
            Self::TestTensor => "test_tensors",
            Self::Sample => "samples",
            Self::Cover => "covers",
            Self::Attachment => "attachments",
            Self::Documentation => "docs",
        }
    }
}

/// A file reference and where in the description it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
    pub field: String,
    pub reference: FileReference,
    pub role: FileRole,
}

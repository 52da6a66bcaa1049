//! Resource description model and parser.

pub mod file_ref;
pub mod model;
pub mod parse;
pub mod slot;

pub use file_ref::FileReference;
pub use model::{
    AXIS_TYPES, Architecture, ArchitectureSource, Attachments, Author, AxisDescr, AxisSize, Axes,
    CiteEntry, Extra, FileDescr, FileRole, ImplicitShape, KNOWN_FIELDS, LegacyAttachments,
    PASSTHROUGH_FIELDS, ParameterizedShape, ParameterizedSize, ReferenceSite, ResourceDescription, Shape,
    SizeReference, TensorDescr, WEIGHTS_FORMATS, WeightsEntry,
};
pub use parse::DescriptionParser;
pub use slot::Slot;

/// File name of the description inside a directory or package.
pub const DESCRIPTION_FILE_NAME: &str = "rdf.yaml";

/// Names probed, in order, when a directory or archive is given as a source.
pub const DESCRIPTION_FILE_NAMES: &[&str] = &["rdf.yaml", "bioimageio.yaml"];

/// Suffix of named description files, e.g. `unet.bioimageio.yaml`.
pub const DESCRIPTION_FILE_SUFFIX: &str = ".bioimageio.yaml";

/// Pick the description among the files of a directory or archive.
///
/// Fixed names win; otherwise exactly one `*.bioimageio.yaml` must exist.
#[must_use]
pub fn find_description_name<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    for fixed in DESCRIPTION_FILE_NAMES {
        if names.contains(fixed) {
            return Some((*fixed).to_string());
        }
    }
    let mut suffixed = names
        .iter()
        .filter(|name| !name.contains('/') && name.ends_with(DESCRIPTION_FILE_SUFFIX));
    match (suffixed.next(), suffixed.next()) {
        (Some(only), None) => Some((*only).to_string()),
        _ => None,
    }
}

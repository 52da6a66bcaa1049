//! Resolve, validate, write and package bioimage.io resource descriptions.
//!
//! The quickest way in is through the free functions re-exported from
//! [`pipeline`]; build a [`Pipeline`] from a [`config::Config`] to control
//! caching, version pinning and validation settings.
//!
//! ```no_run
//! let rd = bioimageio_core::load_description("models/unet2d")?;
//! bioimageio_core::write_package(&rd, "unet2d.zip")?;
//! # Ok::<(), bioimageio_core::RdfError>(())
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod lint;
pub mod package;
pub mod pipeline;
pub mod rdf;
pub mod source;
pub mod spec_version;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod writer;

pub use error::{RdfError, Result};
pub use pipeline::{
    Pipeline, load_description, max_supported_format_version, read_description,
    read_description_and_validate, resolve_source, validate_description, write_description,
    write_package,
};

//! End-to-end scenarios through the library pipeline.

#[path = "../common/mod.rs"]
mod common;
mod package_workflow;
mod remote_workflow;
mod write_workflow;

//! bioimageio package - Bundle a description and its files into a zip

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::commands::source_arg;
use crate::cli::output::{HumanLayout, emit_human, emit_json, json_ok};
use crate::config::Compression;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Description file, directory, zip package or URL (`-` reads stdin)
    pub source: String,

    /// Archive to write
    #[arg(long, short)]
    pub output: PathBuf,

    /// Replace an existing archive
    #[arg(long)]
    pub overwrite: bool,

    /// Refuse to package a description that fails validation
    #[arg(long)]
    pub require_valid: bool,

    /// Store entries without compression
    #[arg(long)]
    pub stored: bool,

    /// Extra local file to add under attachments/ (repeatable)
    #[arg(long = "extra", value_name = "FILE")]
    pub extra_files: Vec<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &PackageArgs) -> Result<()> {
    let source = source_arg(&args.source)?;
    let description = ctx.pipeline.read_description(&source)?;

    let mut options = ctx.pipeline.package_options().clone();
    options.overwrite |= args.overwrite;
    options.require_valid |= args.require_valid;
    if args.stored {
        options.compression = Compression::Stored;
    }
    options.extra_files.extend(args.extra_files.iter().cloned());

    let manifest = ctx
        .pipeline
        .write_package_with(&description, &args.output, options)?;

    if ctx.is_json() {
        return emit_json(&json_ok(&manifest));
    }

    let mut layout = HumanLayout::new();
    layout.title("Package");
    layout.kv("Source", &source.to_string());
    layout.kv("Archive", &manifest.target.display().to_string());
    layout.kv("Format version", &manifest.format_version);
    layout.kv("Total size", &format!("{} bytes", manifest.total_size()));
    layout.section("Entries");
    for entry in &manifest.entries {
        let note = if entry.referenced { "" } else { " (extra)" };
        layout.bullet(&format!(
            "{} {} bytes sha256:{}{note}",
            entry.archive_path,
            entry.size,
            &entry.sha256[..12.min(entry.sha256.len())]
        ));
    }
    emit_human(&layout);
    Ok(())
}

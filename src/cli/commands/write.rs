//! bioimageio write - Write a description in canonical form

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::source_arg;
use crate::cli::output::{HumanLayout, emit_human, emit_json, json_ok};
use crate::error::Result;
use crate::writer::to_yaml_string;

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Description file, directory, zip package or URL (`-` reads stdin)
    pub source: String,

    /// Target file or directory; prints to stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &WriteArgs) -> Result<()> {
    let source = source_arg(&args.source)?;
    let description = ctx.pipeline.read_description(&source)?;

    let Some(target) = &args.output else {
        print!("{}", to_yaml_string(&description)?);
        return Ok(());
    };

    let written = ctx.pipeline.write_description(&description, target)?;
    if ctx.is_json() {
        return emit_json(&json_ok(WriteOutput {
            source: source.to_string(),
            path: written,
            format_version: description.format_version.to_string(),
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title("Write");
    layout.kv("Source", &source.to_string());
    layout.kv("Written", &written.display().to_string());
    emit_human(&layout);
    Ok(())
}

#[derive(Serialize)]
struct WriteOutput {
    source: String,
    path: PathBuf,
    format_version: String,
}

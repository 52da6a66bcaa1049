//! bioimageio resolve - Show where a source resolves to

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::source_arg;
use crate::cli::output::{HumanLayout, emit_human, emit_json, json_ok};
use crate::error::Result;
use crate::rdf::FileRole;
use crate::source::locate;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Description file, directory, zip package or URL (`-` reads stdin)
    pub source: String,

    /// Also list the description's file references and where they point
    #[arg(long)]
    pub references: bool,
}

#[derive(Serialize)]
struct ResolveOutput {
    origin: String,
    root: String,
    sha256: String,
    size: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<ReferenceOutput>,
}

#[derive(Serialize)]
struct ReferenceOutput {
    field: String,
    reference: String,
    role: FileRole,
    location: String,
}

pub fn run(ctx: &AppContext, args: &ResolveArgs) -> Result<()> {
    let source = source_arg(&args.source)?;
    let resolved = ctx.pipeline.resolve_source(&source)?;

    let mut references = Vec::new();
    if args.references {
        let description = ctx.pipeline.parser().parse(
            &resolved.content,
            resolved.root.clone(),
            &resolved.origin,
        )?;
        for site in description.file_references() {
            let location = locate(&site.reference, &description.root)
                .map_or_else(|err| format!("<{err}>"), |located| located.to_string());
            references.push(ReferenceOutput {
                field: site.field,
                reference: site.reference.to_string(),
                role: site.role,
                location,
            });
        }
    }

    let output = ResolveOutput {
        origin: resolved.origin,
        root: resolved.root.to_string(),
        sha256: resolved.digest,
        size: resolved.content.len(),
        references,
    };
    if ctx.is_json() {
        return emit_json(&json_ok(&output));
    }

    let mut layout = HumanLayout::new();
    layout.title("Resolve");
    layout.kv("Origin", &output.origin);
    layout.kv("Root", &output.root);
    layout.kv("Size", &format!("{} bytes", output.size));
    layout.kv("sha256", &output.sha256);
    if !output.references.is_empty() {
        layout.section("References");
        for reference in &output.references {
            layout.bullet(&format!(
                "{} = {} -> {}",
                reference.field, reference.reference, reference.location
            ));
        }
    }
    emit_human(&layout);
    Ok(())
}

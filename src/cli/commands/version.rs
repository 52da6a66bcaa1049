//! bioimageio version - Supported format versions and the spec pin

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, json_ok};
use crate::error::Result;
use crate::spec_version::{NEWEST_FORMAT_VERSION, check_release_pin};

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Latest released specification version; fails if the pin is older
    #[arg(long, value_name = "VERSION")]
    pub released: Option<String>,
}

#[derive(Serialize)]
struct VersionOutput {
    crate_version: &'static str,
    pinned_spec_version: String,
    oldest_format_version: String,
    max_format_version: String,
    newest_known_format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    released_spec_version: Option<String>,
}

pub fn run(ctx: &AppContext, args: &VersionArgs) -> Result<()> {
    let pinned = &ctx.config.spec.pinned_version;
    let policy = ctx.pipeline.parser().policy();

    let released = match &args.released {
        Some(released) => Some(check_release_pin(pinned, released)?.released.to_string()),
        None => None,
    };

    let output = VersionOutput {
        crate_version: env!("CARGO_PKG_VERSION"),
        pinned_spec_version: pinned.clone(),
        oldest_format_version: policy.oldest.to_string(),
        max_format_version: policy.ceiling.to_string(),
        newest_known_format_version: NEWEST_FORMAT_VERSION.to_string(),
        released_spec_version: released,
    };
    if ctx.is_json() {
        return emit_json(&json_ok(&output));
    }

    let mut layout = HumanLayout::new();
    layout.title("bioimageio");
    layout.kv("Version", output.crate_version);
    layout.kv("Pinned spec", &output.pinned_spec_version);
    layout.kv("Format versions", &format!(
        "{} to {}",
        output.oldest_format_version, output.max_format_version
    ));
    if let Some(released) = &output.released_spec_version {
        layout.kv("Released spec", &format!("{released} (pin is current)"));
    }
    emit_human(&layout);
    Ok(())
}

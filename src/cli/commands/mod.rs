//! Subcommands. Each module has an `Args` struct and a `run` function.

use clap::Subcommand;

pub mod cache;
pub mod package;
pub mod resolve;
pub mod validate;
pub mod version;
pub mod write;

use crate::app::AppContext;
use crate::error::Result;
use crate::source::SourceRef;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Validate(args) => validate::run(ctx, args),
        Commands::Package(args) => package::run(ctx, args),
        Commands::Write(args) => write::run(ctx, args),
        Commands::Resolve(args) => resolve::run(ctx, args),
        Commands::Version(args) => version::run(ctx, args),
        Commands::Cache(args) => cache::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a description and report findings
    Validate(validate::ValidateArgs),

    /// Bundle a description and its files into a zip package
    Package(package::PackageArgs),

    /// Write a description in canonical form
    Write(write::WriteArgs),

    /// Show where a source resolves to
    Resolve(resolve::ResolveArgs),

    /// Show supported format versions and check the spec pin
    Version(version::VersionArgs),

    /// Inspect or clear the remote fetch cache
    Cache(cache::CacheArgs),
}

/// Source argument as typed on the command line; `-` reads stdin.
pub(crate) fn source_arg(raw: &str) -> Result<SourceRef> {
    if raw == "-" {
        let mut text = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut text)?;
        return Ok(SourceRef::Text(text));
    }
    Ok(SourceRef::parse(raw))
}

//! bioimageio cache - Inspect or clear the remote fetch cache

use clap::{Args, Subcommand};
use reqwest::Url;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, json_ok};
use crate::error::{RdfError, Result};
use crate::source::FetchCache;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached URLs
    List,
    /// Drop the entry for one URL
    Evict(EvictArgs),
    /// Remove every cached entry
    Clear,
}

#[derive(Args, Debug)]
pub struct EvictArgs {
    /// URL whose entry is dropped
    pub url: String,
}

#[derive(Serialize)]
struct RemovedOutput {
    removed: usize,
}

pub fn run(ctx: &AppContext, args: &CacheArgs) -> Result<()> {
    let dir = ctx
        .config
        .cache_dir()
        .ok_or_else(|| RdfError::Cache("no cache directory available".to_string()))?;
    let cache = FetchCache::open(&dir)?;

    match &args.command {
        CacheCommand::List => {
            let entries = cache.list()?;
            if ctx.is_json() {
                return emit_json(&json_ok(&entries));
            }
            let mut layout = HumanLayout::new();
            layout.title("Fetch cache");
            layout.kv("Directory", &cache.root().display().to_string());
            layout.kv("Entries", &entries.len().to_string());
            for entry in &entries {
                layout.bullet(&format!(
                    "{} {} bytes, fetched {}",
                    entry.url,
                    entry.size,
                    entry.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            emit_human(&layout);
        }
        CacheCommand::Evict(evict) => {
            let url = Url::parse(&evict.url)
                .map_err(|err| RdfError::Config(format!("invalid url '{}': {err}", evict.url)))?;
            let removed = usize::from(cache.evict(&url)?);
            report_removed(ctx, removed, &format!("evicted {removed} entry for {url}"))?;
        }
        CacheCommand::Clear => {
            let removed = cache.clear()?;
            report_removed(ctx, removed, &format!("cleared {removed} entries"))?;
        }
    }
    Ok(())
}

fn report_removed(ctx: &AppContext, removed: usize, message: &str) -> Result<()> {
    if ctx.is_json() {
        return emit_json(&json_ok(RemovedOutput { removed }));
    }
    let mut layout = HumanLayout::new();
    layout.push_line(message);
    emit_human(&layout);
    Ok(())
}

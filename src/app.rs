use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Pipeline;

/// Everything a subcommand needs, built once per invocation.
pub struct AppContext {
    pub project_dir: PathBuf,
    pub config: Config,
    pub pipeline: Pipeline,
    pub output_format: OutputFormat,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_dir)?;
        Self::new(project_dir, config, cli.output_format(), cli.verbose)
    }

    pub fn new(
        project_dir: PathBuf,
        config: Config,
        output_format: OutputFormat,
        verbosity: u8,
    ) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self {
            project_dir,
            config,
            pipeline,
            output_format,
            verbosity,
        })
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }
}

//! bioimageio validate - Validate a description and report findings

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::source_arg;
use crate::cli::output::{HumanLayout, emit_human, emit_json, json_ok, status_label};
use crate::error::{RdfError, Result};
use crate::lint::{RuleInfo, ValidationEngine, ValidationReport};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Description file, directory, zip package or URL (`-` reads stdin)
    #[arg(required_unless_present = "list_rules")]
    pub source: Option<String>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// Skip a rule by id (repeatable)
    #[arg(long = "disable", value_name = "RULE")]
    pub disabled: Vec<String>,

    /// Stop reporting after this many errors
    #[arg(long)]
    pub max_errors: Option<usize>,

    /// List the built-in rules and exit
    #[arg(long)]
    pub list_rules: bool,
}

pub fn run(ctx: &AppContext, args: &ValidateArgs) -> Result<()> {
    let engine = engine_for(ctx, args);
    if args.list_rules {
        return list_rules(ctx, &engine);
    }
    let raw = args
        .source
        .as_deref()
        .ok_or_else(|| RdfError::Config("a source is required".to_string()))?;

    let source = source_arg(raw)?;
    let description = ctx.pipeline.read_description(&source)?;
    let report = engine.validate(&description);

    if ctx.is_json() {
        emit_json(&json_ok(ValidateOutput {
            source: source.to_string(),
            format_version: description.format_version.to_string(),
            resource_type: description.resource_type().map(ToString::to_string),
            report: &report,
        }))?;
    } else {
        let mut layout = HumanLayout::new();
        layout.title("Validation");
        layout.kv("Source", &source.to_string());
        layout.kv("Format version", &description.format_version.to_string());
        layout.kv("Type", description.resource_type().unwrap_or("-"));
        if !report.findings.is_empty() {
            layout.section("Findings");
            for finding in &report.findings {
                layout.bullet(&finding.to_string());
            }
            if report.truncated {
                layout.bullet("... (stopped at max_errors)");
            }
        }
        layout.section("Status");
        layout.push_line(format!(
            "{} ({} error(s), {} warning(s))",
            status_label(report.passed),
            report.error_count(),
            report.warning_count()
        ));
        emit_human(&layout);
    }

    if report.passed {
        return Ok(());
    }
    Err(RdfError::ValidationFailed {
        errors: report.error_count(),
        first: report
            .errors()
            .next()
            .map(ToString::to_string)
            .unwrap_or_default(),
    })
}

fn engine_for(ctx: &AppContext, args: &ValidateArgs) -> ValidationEngine {
    let mut config = ctx.pipeline.engine().config().clone();
    if args.strict {
        config = config.strict();
    }
    for rule in &args.disabled {
        config = config.disable_rule(rule.clone());
    }
    if let Some(max) = args.max_errors {
        config = config.with_max_errors(max);
    }
    ValidationEngine::standard(config)
}

fn list_rules(ctx: &AppContext, engine: &ValidationEngine) -> Result<()> {
    let rules = engine.list_rules();
    if ctx.is_json() {
        return emit_json(&json_ok(&rules));
    }
    let mut layout = HumanLayout::new();
    layout.title("Rules");
    for RuleInfo {
        id,
        category,
        default_severity,
        description,
        disabled,
        ..
    } in &rules
    {
        let marker = if *disabled { " (disabled)" } else { "" };
        layout.bullet(&format!("{id} [{category}, {default_severity}]{marker}: {description}"));
    }
    emit_human(&layout);
    Ok(())
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    source: String,
    format_version: String,
    resource_type: Option<String>,
    report: &'a ValidationReport,
}

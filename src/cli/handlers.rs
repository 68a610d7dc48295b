//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 for success, 2 when a run
//! escalates, 1 for configuration or I/O errors.

use crate::cli::commands::{ClassifyArgs, PlanArgs, RunArgs};
use crate::cli::output::OutputFormatter;
use crate::classify::ProjectClassifier;
use crate::config::{ConfigError, MendConfig};
use crate::notify::{LogNotifier, OutcomeHandler, WebhookNotifier};
use crate::pipeline::BuildPipeline;
use crate::plan::{CommandPlanner, PlanOverrides};
use std::env;
use std::path::PathBuf;
use tracing::{debug, error};

/// Resolves the repository path argument, defaulting to the current
/// directory.
fn resolve_repo(path: &Option<PathBuf>) -> Result<PathBuf, i32> {
    match path {
        Some(p) => Ok(p.clone()),
        None => env::current_dir().map_err(|e| {
            error!("Cannot determine current directory: {}", e);
            1
        }),
    }
}

/// Builds the effective configuration for `run` from environment plus flags.
fn effective_config(args: &RunArgs) -> Result<MendConfig, ConfigError> {
    let mut config = MendConfig::from_env()?;

    if let Some(provider) = args.backend {
        config.provider = provider;
        // Keep an explicitly configured model; otherwise track the provider.
        if args.model.is_none() && env::var("BUILDMEND_MODEL").is_err() {
            config.model = provider.default_model().to_string();
        }
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(timeout) = args.timeout {
        config.command_timeout_secs = timeout;
    }
    if let Some(url) = &args.webhook_url {
        config.webhook_url = Some(url.clone());
    }
    if let Some(version) = &args.tool_version {
        config.tool_version = Some(version.clone());
    }

    Ok(config)
}

pub async fn handle_run(args: &RunArgs) -> i32 {
    let config = match effective_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };
    if let Err(e) = config.validate() {
        error!("{}", e);
        return 1;
    }
    debug!("Effective configuration:\n{}", config);

    let repo = match resolve_repo(&args.repository_path) {
        Ok(repo) => repo,
        Err(code) => return code,
    };
    let formatter = OutputFormatter::new(args.format.into());

    if args.dry_run {
        let profile = ProjectClassifier::classify(&repo);
        let plan = CommandPlanner::plan(&profile, &config.pipeline_settings().overrides);
        return print_or_fail(formatter.format_plan(&profile, &plan));
    }

    let mut handler = OutcomeHandler::new().with_notifier(Box::new(LogNotifier));
    if let Some(url) = &config.webhook_url {
        handler = handler.with_notifier(Box::new(WebhookNotifier::new(url.clone())));
    }

    let pipeline =
        BuildPipeline::new(config.create_backend(), config.pipeline_settings()).with_handler(handler);
    let report = pipeline.run(&repo).await;

    match formatter.format_report(&report) {
        Ok(output) => {
            println!("{}", output);
            report.verdict.exit_code()
        }
        Err(e) => {
            error!("Failed to format report: {}", e);
            1
        }
    }
}

pub async fn handle_classify(args: &ClassifyArgs) -> i32 {
    let repo = match resolve_repo(&args.repository_path) {
        Ok(repo) => repo,
        Err(code) => return code,
    };
    let profile = ProjectClassifier::classify(&repo);
    let formatter = OutputFormatter::new(args.format.into());
    print_or_fail(formatter.format_profile(&profile))
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    let repo = match resolve_repo(&args.repository_path) {
        Ok(repo) => repo,
        Err(code) => return code,
    };
    let profile = ProjectClassifier::classify(&repo);
    let overrides = PlanOverrides {
        tool_version: args.tool_version.clone(),
    };
    let plan = CommandPlanner::plan(&profile, &overrides);
    let formatter = OutputFormatter::new(args.format.into());
    print_or_fail(formatter.format_plan(&profile, &plan))
}

fn print_or_fail(result: anyhow::Result<String>) -> i32 {
    match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

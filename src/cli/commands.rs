use crate::ai::Provider;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Autonomous build-and-remediate agent for unknown repositories
#[derive(Parser, Debug)]
#[command(
    name = "buildmend",
    about = "Classify, build, and automatically remediate failing repositories",
    version,
    long_about = "buildmend classifies a repository by its toolchain fingerprints, plans the \
                  install and build commands for that ecosystem, executes them under a hard \
                  timeout, and on failure asks an LLM backend (Ollama, OpenAI, Claude, Gemini, \
                  Grok, Groq) for a patch, applies it atomically, and retries within a bounded \
                  attempt budget."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the full build-and-remediate pipeline",
        long_about = "Classifies the repository, runs its install and build commands, and on \
                      failure requests fixes from the configured LLM backend until the build \
                      succeeds or the attempt budget is spent.\n\n\
                      Exit codes: 0 on success, 2 when the run escalates, 1 on configuration \
                      errors.\n\n\
                      Examples:\n  \
                      buildmend run\n  \
                      buildmend run /path/to/repo --max-attempts 5\n  \
                      buildmend run --backend claude --model claude-sonnet-4-5-20250929\n  \
                      buildmend run --dry-run --format json"
    )]
    Run(RunArgs),

    #[command(
        about = "Classify a repository without building it",
        long_about = "Scans the repository for toolchain fingerprints and reports the detected \
                      project kind, package manager, and version hints.\n\n\
                      Examples:\n  \
                      buildmend classify\n  \
                      buildmend classify /path/to/repo --format json"
    )]
    Classify(ClassifyArgs),

    #[command(
        about = "Show the command plan for a repository without executing it",
        long_about = "Classifies the repository and prints the install and build commands the \
                      run subcommand would execute.\n\n\
                      Examples:\n  \
                      buildmend plan\n  \
                      buildmend plan /path/to/repo --tool-version 3.12"
    )]
    Plan(PlanArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'b',
        long,
        value_enum,
        help = "LLM backend provider (overrides BUILDMEND_PROVIDER)"
    )]
    pub backend: Option<Provider>,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name (provider-specific, overrides BUILDMEND_MODEL)"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "N",
        help = "Remediated retries after the initial build (overrides BUILDMEND_MAX_ATTEMPTS)"
    )]
    pub max_attempts: Option<u32>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Per-command timeout (overrides BUILDMEND_COMMAND_TIMEOUT)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        long,
        value_name = "URL",
        help = "Webhook for the run report (overrides BUILDMEND_WEBHOOK_URL)"
    )]
    pub webhook_url: Option<String>,

    #[arg(
        long,
        value_name = "VERSION",
        help = "Toolchain version override for planned commands"
    )]
    pub tool_version: Option<String>,

    #[arg(long, help = "Classify and plan only; execute nothing")]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "VERSION",
        help = "Toolchain version override for planned commands"
    )]
    pub tool_version: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, ClassifyArgs, Commands, PlanArgs, RunArgs};
pub use output::{OutputFormat, OutputFormatter};

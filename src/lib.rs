//! buildmend - autonomous build-and-remediate agent
//!
//! This library takes an unknown repository, classifies its toolchain from
//! fingerprint files, plans the install and build commands for that
//! ecosystem, executes them under hard timeouts, and feeds failures to an
//! LLM backend that proposes file edits. Proposed patch sets are validated
//! and applied atomically, then the build retries within a bounded attempt
//! budget. Every run terminates with a verdict and a full report.
//!
//! # Core Concepts
//!
//! - **Classification**: Fingerprint files (lockfiles, manifests, build
//!   descriptors) map the repository to a [`classify::ProjectKind`]
//! - **Planning**: A pure function from profile to install and build
//!   commands; unknown toolchains yield an empty plan
//! - **Remediation**: Failed attempts become structured fix requests for a
//!   pluggable [`ai::FixBackend`]; edits apply all-or-nothing inside the
//!   repository root
//! - **Escalation**: Runs that cannot succeed end with an explicit reason
//!   instead of an open-ended retry loop
//!
//! # Example Usage
//!
//! ```ignore
//! use buildmend::config::MendConfig;
//! use buildmend::pipeline::BuildPipeline;
//! use std::path::Path;
//!
//! async fn mend(repo: &Path) -> i32 {
//!     let config = MendConfig::from_env().unwrap();
//!     let pipeline = BuildPipeline::new(config.create_backend(), config.pipeline_settings());
//!     let report = pipeline.run(repo).await;
//!     report.verdict.exit_code()
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`classify`]: Fingerprint-based toolchain classification
//! - [`plan`]: Ecosystem command planning
//! - [`exec`]: Bounded external process execution
//! - [`remedy`]: Fix requests, response parsing, and atomic patch apply
//! - [`ai`]: LLM backend implementations and abstractions
//! - [`pipeline`]: The retry state machine and run reports
//! - [`notify`]: Outcome handling and report delivery

pub mod ai;
pub mod classify;
pub mod cli;
pub mod config;
pub mod exec;
pub mod notify;
pub mod pipeline;
pub mod plan;
pub mod remedy;

// Re-export key types for convenient access
pub use ai::backend::{BackendError, FixBackend};
pub use ai::genai_backend::{GenAIBackend, Provider};
pub use classify::{ProjectClassifier, ProjectKind, ProjectProfile};
pub use config::{ConfigError, MendConfig};
pub use exec::{ExecutionOutcome, ProcessRunner};
pub use pipeline::{BuildPipeline, EscalationReason, RunReport, Verdict};
pub use plan::{CommandPlan, CommandPlanner};
pub use remedy::{FixOutcome, RemediationEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn name_matches_package() {
        assert_eq!(NAME, "buildmend");
    }
}

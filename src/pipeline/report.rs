//! Run verdicts and the final report

use crate::classify::ProjectProfile;
use crate::exec::ExecutionOutcome;
use crate::plan::CommandPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a run gave up instead of succeeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationReason {
    /// Classification found no known toolchain, so no commands were planned.
    NoToolchainDetected,
    /// The build still failed after the last permitted attempt.
    RetryBudgetExhausted,
    /// The failure could not be remediated (service error, unfixable, or
    /// an invalid patch set), so retrying would repeat the same failure.
    RemediationUnavailable,
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EscalationReason::NoToolchainDetected => "NO_TOOLCHAIN_DETECTED",
            EscalationReason::RetryBudgetExhausted => "RETRY_BUDGET_EXHAUSTED",
            EscalationReason::RemediationUnavailable => "REMEDIATION_UNAVAILABLE",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Success,
    Escalated { reason: EscalationReason },
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Success => 0,
            Verdict::Escalated { .. } => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => write!(f, "SUCCESS"),
            Verdict::Escalated { reason } => write!(f, "ESCALATED ({})", reason),
        }
    }
}

/// Everything that happened during one install-then-build attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub succeeded: bool,
    /// Outcomes of the install commands that ran, in order. Stops at the
    /// first failure.
    pub install_outcomes: Vec<ExecutionOutcome>,
    /// Outcome of the build command, absent when an install command failed
    /// first.
    pub build_outcome: Option<ExecutionOutcome>,
    /// Zero-based attempt index within the run.
    pub attempt: u32,
}

impl BuildResult {
    /// The outcome whose diagnostics describe the failure, if any.
    ///
    /// The build outcome wins over install outcomes since a present build
    /// outcome means every install succeeded.
    pub fn failing_outcome(&self) -> Option<&ExecutionOutcome> {
        if let Some(build) = &self.build_outcome {
            if !build.succeeded() {
                return Some(build);
            }
        }
        self.install_outcomes.iter().rev().find(|o| !o.succeeded())
    }
}

/// One attempt plus the remediation that followed it, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub result: BuildResult,
    /// Summary of the remediation that followed this attempt, whether it
    /// applied or not. Absent on the successful attempt and when the budget
    /// was already spent.
    pub fix_summary: Option<String>,
}

/// Complete record of one pipeline run. Serialized for webhooks and the
/// JSON/YAML output formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub repo_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub profile: ProjectProfile,
    pub plan: CommandPlan,
    pub attempts: Vec<AttemptRecord>,
    /// Summaries of the fixes applied across the run, in order.
    pub fix_summaries: Vec<String>,
    pub verdict: Verdict,
    /// Backend identity, absent when remediation never ran.
    pub backend: Option<String>,
}

impl RunReport {
    /// Number of remediated retries that were needed; 0 for a clean run.
    pub fn fix_attempt_count(&self) -> usize {
        self.fix_summaries.len()
    }
}

//! The build-and-remediate pipeline
//!
//! One run walks a repository through classify, plan, install, build, and
//! on failure hands the diagnostics to the remediation engine and retries,
//! up to a bounded number of fix attempts. Every run terminates with a
//! [`Verdict`] and a full [`RunReport`], and the outcome handler fires
//! exactly once per run.

use crate::ai::FixBackend;
use crate::classify::{ProjectClassifier, ProjectProfile};
use crate::exec::ProcessRunner;
use crate::notify::OutcomeHandler;
use crate::plan::{CommandPlan, CommandPlanner, PlanOverrides};
use crate::remedy::RemediationEngine;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub mod report;

pub use report::{AttemptRecord, BuildResult, EscalationReason, RunReport, Verdict};

/// Knobs for one pipeline instance, typically filled from [`crate::config`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum number of remediated retries after the initial build.
    pub max_attempts: u32,
    /// Hard wall-clock timeout per command.
    pub command_timeout: Duration,
    /// Per-stream capture cap for command output.
    pub max_output_bytes: usize,
    /// Character cap on the error log sent to the backend.
    pub max_error_len: usize,
    pub overrides: PlanOverrides,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            command_timeout: Duration::from_secs(600),
            max_output_bytes: 262_144,
            max_error_len: 10_000,
            overrides: PlanOverrides::default(),
        }
    }
}

/// Drives a repository from classification to a terminal verdict.
pub struct BuildPipeline {
    runner: ProcessRunner,
    remediation: RemediationEngine,
    handler: OutcomeHandler,
    max_attempts: u32,
    overrides: PlanOverrides,
    backend_info: Option<String>,
}

impl BuildPipeline {
    pub fn new(backend: Arc<dyn FixBackend>, settings: PipelineSettings) -> Self {
        let backend_info = Some(
            backend
                .model_info()
                .unwrap_or_else(|| backend.name().to_string()),
        );
        Self {
            runner: ProcessRunner::new(settings.command_timeout, settings.max_output_bytes),
            remediation: RemediationEngine::new(backend, settings.max_error_len),
            handler: OutcomeHandler::default(),
            max_attempts: settings.max_attempts,
            overrides: settings.overrides,
            backend_info,
        }
    }

    /// Replaces the outcome handler.
    pub fn with_handler(mut self, handler: OutcomeHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Classifies the repository and runs it to a verdict.
    pub async fn run(&self, repo: &Path) -> RunReport {
        let profile = ProjectClassifier::classify(repo);
        info!("Classified {} as {}", repo.display(), profile);
        let plan = CommandPlanner::plan(&profile, &self.overrides);
        self.run_planned(profile, plan).await
    }

    /// Runs an already-classified repository with an explicit plan.
    pub async fn run_planned(&self, profile: ProjectProfile, plan: CommandPlan) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!("Starting run {} for {}", run_id, profile.root_path.display());

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut fix_summaries: Vec<String> = Vec::new();
        let mut remediation_ran = false;

        let verdict = if profile.kind.is_unknown() || plan.is_empty() {
            warn!(
                "No known toolchain in {}, nothing to build",
                profile.root_path.display()
            );
            Verdict::Escalated {
                reason: EscalationReason::NoToolchainDetected,
            }
        } else {
            let mut verdict = Verdict::Escalated {
                reason: EscalationReason::RetryBudgetExhausted,
            };
            for attempt in 0..=self.max_attempts {
                let result = self.run_attempt(&plan, attempt).await;

                if result.succeeded {
                    info!("Attempt {} succeeded", attempt);
                    attempts.push(AttemptRecord {
                        result,
                        fix_summary: None,
                    });
                    verdict = Verdict::Success;
                    break;
                }

                if attempt == self.max_attempts {
                    warn!("Attempt {} failed with the retry budget spent", attempt);
                    attempts.push(AttemptRecord {
                        result,
                        fix_summary: None,
                    });
                    break;
                }

                remediation_ran = true;
                let fix = self
                    .remediation
                    .remediate(&result, &profile, &fix_summaries)
                    .await;

                if !fix.applied {
                    warn!("Attempt {} failed and no fix was applied: {}", attempt, fix.summary);
                    attempts.push(AttemptRecord {
                        result,
                        fix_summary: Some(fix.summary),
                    });
                    verdict = Verdict::Escalated {
                        reason: EscalationReason::RemediationUnavailable,
                    };
                    break;
                }

                info!("Attempt {} failed, fix applied: {}", attempt, fix.summary);
                fix_summaries.push(fix.summary.clone());
                attempts.push(AttemptRecord {
                    result,
                    fix_summary: Some(fix.summary),
                });
            }
            verdict
        };

        let report = RunReport {
            run_id,
            repo_path: profile.root_path.clone(),
            started_at,
            finished_at: Utc::now(),
            profile,
            plan,
            attempts,
            fix_summaries,
            verdict,
            backend: if remediation_ran {
                self.backend_info.clone()
            } else {
                None
            },
        };

        self.handler.handle(&report).await;
        report
    }

    /// Runs the install commands in order, then the build command. Stops at
    /// the first failing install command.
    async fn run_attempt(&self, plan: &CommandPlan, attempt: u32) -> BuildResult {
        let mut install_outcomes = Vec::new();
        for command in &plan.install_commands {
            info!("[attempt {}] install: {}", attempt, command);
            let outcome = self.runner.run(command).await;
            let ok = outcome.succeeded();
            install_outcomes.push(outcome);
            if !ok {
                return BuildResult {
                    succeeded: false,
                    install_outcomes,
                    build_outcome: None,
                    attempt,
                };
            }
        }

        let build_outcome = match &plan.build_command {
            Some(command) => {
                info!("[attempt {}] build: {}", attempt, command);
                Some(self.runner.run(command).await)
            }
            None => None,
        };

        let succeeded = build_outcome.as_ref().map_or(true, |o| o.succeeded());
        BuildResult {
            succeeded,
            install_outcomes,
            build_outcome,
            attempt,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ai::mock::MockFixBackend;
    use crate::classify::ProjectKind;
    use crate::plan::Command;
    use crate::remedy::types::{FileEdit, FixResponse};
    use std::fs;
    use tempfile::TempDir;

    fn sh(cwd: &std::path::PathBuf, script: &str) -> Command {
        Command::new(cwd, "sh", &["-c", script])
    }

    fn profile_for(dir: &TempDir) -> ProjectProfile {
        ProjectProfile {
            kind: ProjectKind::Python,
            package_manager: None,
            tool_version_hint: None,
            root_path: dir.path().to_path_buf(),
        }
    }

    fn pipeline(backend: Arc<MockFixBackend>, max_attempts: u32) -> BuildPipeline {
        BuildPipeline::new(
            backend,
            PipelineSettings {
                max_attempts,
                command_timeout: Duration::from_secs(10),
                ..PipelineSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn clean_build_never_calls_the_backend() {
        let repo = TempDir::new().unwrap();
        let cwd = repo.path().to_path_buf();
        let backend = Arc::new(MockFixBackend::new());

        let plan = CommandPlan {
            install_commands: vec![sh(&cwd, "true")],
            build_command: Some(sh(&cwd, "true")),
        };
        let report = pipeline(backend.clone(), 3)
            .run_planned(profile_for(&repo), plan)
            .await;

        assert!(report.verdict.is_success());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.fix_attempt_count(), 0);
        assert_eq!(backend.call_count(), 0);
        assert!(report.backend.is_none());
    }

    #[tokio::test]
    async fn fix_flips_failure_into_success() {
        let repo = TempDir::new().unwrap();
        let cwd = repo.path().to_path_buf();
        let backend = Arc::new(MockFixBackend::new());
        backend.push_response(Ok(FixResponse {
            fixable: true,
            rationale: "create the marker".to_string(),
            edits: vec![FileEdit {
                path: "ok".to_string(),
                content: "1".to_string(),
            }],
        }));

        // The build succeeds once the marker file exists.
        let plan = CommandPlan {
            install_commands: vec![],
            build_command: Some(sh(&cwd, "test -f ok")),
        };
        let report = pipeline(backend.clone(), 3)
            .run_planned(profile_for(&repo), plan)
            .await;

        assert!(report.verdict.is_success());
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.fix_attempt_count(), 1);
        assert_eq!(backend.call_count(), 1);
        assert!(fs::read_to_string(repo.path().join("ok")).is_ok());
    }

    #[tokio::test]
    async fn budget_bounds_the_number_of_builds() {
        let repo = TempDir::new().unwrap();
        let cwd = repo.path().to_path_buf();
        let backend = Arc::new(MockFixBackend::new());
        for _ in 0..2 {
            backend.push_response(Ok(FixResponse {
                fixable: true,
                rationale: "try again".to_string(),
                edits: vec![FileEdit {
                    path: "noop".to_string(),
                    content: "x".to_string(),
                }],
            }));
        }

        let plan = CommandPlan {
            install_commands: vec![],
            build_command: Some(sh(&cwd, "false")),
        };
        let report = pipeline(backend.clone(), 2)
            .run_planned(profile_for(&repo), plan)
            .await;

        assert_eq!(
            report.verdict,
            Verdict::Escalated {
                reason: EscalationReason::RetryBudgetExhausted
            }
        );
        // max_attempts retries plus the initial build.
        assert_eq!(report.attempts.len(), 3);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn unfixable_failure_escalates_early() {
        let repo = TempDir::new().unwrap();
        let cwd = repo.path().to_path_buf();
        let backend = Arc::new(MockFixBackend::new());
        backend.push_response(Ok(FixResponse::unfixable("disk is on fire")));

        let plan = CommandPlan {
            install_commands: vec![],
            build_command: Some(sh(&cwd, "false")),
        };
        let report = pipeline(backend.clone(), 3)
            .run_planned(profile_for(&repo), plan)
            .await;

        assert_eq!(
            report.verdict,
            Verdict::Escalated {
                reason: EscalationReason::RemediationUnavailable
            }
        );
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(backend.call_count(), 1);
        assert!(report.attempts[0]
            .fix_summary
            .as_deref()
            .unwrap()
            .contains("disk is on fire"));
    }

    #[tokio::test]
    async fn empty_plan_escalates_without_running_anything() {
        let repo = TempDir::new().unwrap();
        let backend = Arc::new(MockFixBackend::new());

        let report = pipeline(backend.clone(), 3)
            .run_planned(ProjectProfile::unknown(repo.path().to_path_buf()), CommandPlan::default())
            .await;

        assert_eq!(
            report.verdict,
            Verdict::Escalated {
                reason: EscalationReason::NoToolchainDetected
            }
        );
        assert!(report.attempts.is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn install_failure_is_remediated_like_a_build_failure() {
        let repo = TempDir::new().unwrap();
        let cwd = repo.path().to_path_buf();
        let backend = Arc::new(MockFixBackend::new());
        backend.push_response(Ok(FixResponse {
            fixable: true,
            rationale: "restore lockfile".to_string(),
            edits: vec![FileEdit {
                path: "lock".to_string(),
                content: "v1".to_string(),
            }],
        }));

        let plan = CommandPlan {
            install_commands: vec![sh(&cwd, "test -f lock")],
            build_command: Some(sh(&cwd, "true")),
        };
        let report = pipeline(backend.clone(), 3)
            .run_planned(profile_for(&repo), plan)
            .await;

        assert!(report.verdict.is_success());
        assert_eq!(backend.call_count(), 1);
        // The failed attempt never reached the build command.
        assert!(report.attempts[0].result.build_outcome.is_none());
        let seen = backend.requests();
        assert_eq!(seen[0].truncated_error_log, "command produced no output");
    }
}

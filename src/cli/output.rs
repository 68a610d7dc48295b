//! Output formatting for the CLI
//!
//! Renders classification results, command plans, and run reports as JSON,
//! YAML, or human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::classify::ProjectProfile;
use crate::pipeline::{RunReport, Verdict};
use crate::plan::CommandPlan;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Classification plus plan, the payload of `classify` and `plan`.
#[derive(Debug, Serialize)]
pub struct PlanView<'a> {
    pub profile: &'a ProjectProfile,
    pub plan: &'a CommandPlan,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the profile alone, for `classify`.
    pub fn format_profile(&self, profile: &ProjectProfile) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(profile),
            OutputFormat::Yaml => to_yaml(profile),
            OutputFormat::Human => Ok(self.human_profile(profile)),
        }
    }

    /// Formats the profile and its derived plan, for `plan` and dry runs.
    pub fn format_plan(&self, profile: &ProjectProfile, plan: &CommandPlan) -> Result<String> {
        let view = PlanView { profile, plan };
        match self.format {
            OutputFormat::Json => to_json(&view),
            OutputFormat::Yaml => to_yaml(&view),
            OutputFormat::Human => Ok(self.human_plan(profile, plan)),
        }
    }

    /// Formats a complete run report, for `run`.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Human => Ok(self.human_report(report)),
        }
    }

    fn human_profile(&self, profile: &ProjectProfile) -> String {
        let mut out = String::new();
        out.push_str(&format!("Repository: {}\n", profile.root_path.display()));
        out.push_str(&format!("Project kind: {}\n", profile.kind));
        if let Some(pm) = profile.package_manager {
            out.push_str(&format!("Package manager: {}\n", pm));
        }
        if let Some(version) = &profile.tool_version_hint {
            out.push_str(&format!("Toolchain version hint: {}\n", version));
        }
        out
    }

    fn human_plan(&self, profile: &ProjectProfile, plan: &CommandPlan) -> String {
        let mut out = self.human_profile(profile);
        if plan.is_empty() {
            out.push_str("No commands planned (unknown toolchain)\n");
            return out;
        }
        out.push_str("Install commands:\n");
        for command in &plan.install_commands {
            out.push_str(&format!("  {}\n", command));
        }
        if let Some(build) = &plan.build_command {
            out.push_str(&format!("Build command:\n  {}\n", build));
        }
        out
    }

    fn human_report(&self, report: &RunReport) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run: {}\n", report.run_id));
        out.push_str(&format!("Repository: {}\n", report.repo_path.display()));
        out.push_str(&format!("Project kind: {}\n", report.profile.kind));
        out.push_str(&format!("Verdict: {}\n", report.verdict));
        out.push_str(&format!("Attempts: {}\n", report.attempts.len()));
        if let Some(backend) = &report.backend {
            out.push_str(&format!("Backend: {}\n", backend));
        }
        if !report.fix_summaries.is_empty() {
            out.push_str("Fixes applied:\n");
            for (i, summary) in report.fix_summaries.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, summary));
            }
        }
        if let Verdict::Escalated { .. } = report.verdict {
            if let Some(last) = report.attempts.last() {
                if let Some(failing) = last.result.failing_outcome() {
                    out.push_str(&format!(
                        "Last failure (exit {}{}):\n",
                        failing.exit_code,
                        if failing.timed_out { ", timed out" } else { "" }
                    ));
                    for line in failing.diagnostic_text().lines().rev().take(20).collect::<Vec<_>>().iter().rev() {
                        out.push_str(&format!("  {}\n", line));
                    }
                }
            }
        }
        out
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize to YAML")
}

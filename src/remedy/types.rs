//! Remediation request and response types

use crate::classify::ProjectKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error report submitted to the reasoning backend.
///
/// Built fresh per remediation attempt; the error log is the tail of the
/// captured diagnostics, since the last lines of build tool output are the
/// most diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRequest {
    pub truncated_error_log: String,
    pub project_kind: ProjectKind,
    pub attempt_number: u32,
    /// Summaries of fixes already applied in this run, so the backend can
    /// avoid proposing the same unsuccessful fix again.
    pub previous_fix_summaries: Vec<String>,
}

/// One proposed file edit: full replacement content for the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    pub path: String,
    pub content: String,
}

/// Proposed patch set returned by the backend.
///
/// Validated before application and discarded afterwards; the file system is
/// the durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResponse {
    /// Whether the backend judged the failure fixable at all.
    pub fixable: bool,
    pub rationale: String,
    #[serde(default)]
    pub edits: Vec<FileEdit>,
}

impl FixResponse {
    pub fn unfixable(rationale: impl Into<String>) -> Self {
        Self {
            fixable: false,
            rationale: rationale.into(),
            edits: Vec::new(),
        }
    }
}

/// What the remediation engine reports back to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixOutcome {
    pub applied: bool,
    pub summary: String,
}

impl FixOutcome {
    pub fn applied(summary: impl Into<String>) -> Self {
        Self {
            applied: true,
            summary: summary.into(),
        }
    }

    pub fn not_applied(summary: impl Into<String>) -> Self {
        Self {
            applied: false,
            summary: summary.into(),
        }
    }
}

impl fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.applied {
            write!(f, "applied: {}", self.summary)
        } else {
            write!(f, "not applied: {}", self.summary)
        }
    }
}

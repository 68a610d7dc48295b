//! Failure remediation
//!
//! Turns a failed build attempt into a structured fix request, sends it to
//! the reasoning backend, and applies the returned patch set atomically.
//! Every failure mode inside this module (service error, malformed response,
//! unsafe edit) is absorbed here and surfaces to the pipeline only as
//! `applied: false`.

use crate::ai::backend::FixBackend;
use crate::classify::ProjectProfile;
use crate::pipeline::BuildResult;
use std::sync::Arc;
use tracing::{info, warn};

pub mod apply;
pub mod prompt;
pub mod response;
pub mod types;

pub use types::{FileEdit, FixOutcome, FixRequest, FixResponse};

/// Keeps the tail of the text, capped at `max_chars` characters.
///
/// The last lines of build tool output carry the actual error, so the head
/// is what gets discarded.
pub fn tail_truncate(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

/// Drives one remediation attempt against the reasoning backend.
pub struct RemediationEngine {
    backend: Arc<dyn FixBackend>,
    max_error_len: usize,
}

impl RemediationEngine {
    pub fn new(backend: Arc<dyn FixBackend>, max_error_len: usize) -> Self {
        Self {
            backend,
            max_error_len,
        }
    }

    /// Attempts to fix the failure captured in `result`.
    ///
    /// Returns `applied: true` only when a validated patch set has been
    /// written to the working tree in full. All service and validation
    /// failures are recoverable conditions consumed here.
    pub async fn remediate(
        &self,
        result: &BuildResult,
        profile: &ProjectProfile,
        previous_fix_summaries: &[String],
    ) -> FixOutcome {
        let Some(diagnostic) = result.failing_outcome() else {
            return FixOutcome::not_applied("no failing outcome to diagnose");
        };

        let request = FixRequest {
            truncated_error_log: tail_truncate(&diagnostic.diagnostic_text(), self.max_error_len),
            project_kind: profile.kind,
            attempt_number: result.attempt,
            previous_fix_summaries: previous_fix_summaries.to_vec(),
        };

        info!(
            "Requesting fix from {} (attempt {}, log {} chars)",
            self.backend.name(),
            request.attempt_number,
            request.truncated_error_log.len()
        );

        let fix = match self.backend.analyze(&request).await {
            Ok(fix) => fix,
            Err(e) => {
                warn!("Remediation service failed: {}", e);
                return FixOutcome::not_applied(format!("remediation service failed: {}", e));
            }
        };

        if !fix.fixable {
            info!("Backend judged the failure unfixable: {}", fix.rationale);
            return FixOutcome::not_applied(format!("not fixable: {}", fix.rationale));
        }

        if fix.edits.is_empty() {
            warn!("Fixable response carried no edits, treating as unfixable");
            return FixOutcome::not_applied("fixable response contained no edits");
        }

        if let Err(e) = apply::apply_edits(&profile.root_path, &fix.edits) {
            warn!("Rejected proposed patch set: {}", e);
            return FixOutcome::not_applied(format!("patch rejected: {}", e));
        }

        let paths: Vec<&str> = fix.edits.iter().map(|e| e.path.as_str()).collect();
        FixOutcome::applied(format!("edited [{}]: {}", paths.join(", "), fix.rationale))
    }
}

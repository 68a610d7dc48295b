//! Run outcome notification
//!
//! The pipeline hands its final [`RunReport`] to an [`OutcomeHandler`] once
//! per run. The handler logs the verdict and fans the report out to the
//! configured notifiers. Notification failures are logged and swallowed; a
//! dead webhook must never change a run's verdict or exit code.

use crate::pipeline::{RunReport, Verdict};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {code}")]
    Status { code: u16 },
}

/// Delivery channel for run reports.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &RunReport) -> Result<(), NotifyError>;

    fn name(&self) -> &str;
}

/// POSTs the report as JSON to a configured URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, report: &RunReport) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(report).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                code: status.as_u16(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// Writes a one-line summary of the run to the log.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &RunReport) -> Result<(), NotifyError> {
        info!(
            "run {} on {}: {} after {} attempt(s), {} fix(es) applied",
            report.run_id,
            report.repo_path.display(),
            report.verdict,
            report.attempts.len(),
            report.fix_attempt_count(),
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Dispatches the terminal report exactly once per run.
#[derive(Default)]
pub struct OutcomeHandler {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl OutcomeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Logs the verdict and delivers the report to every notifier.
    ///
    /// Never fails: each notifier error is logged and the rest still run.
    pub async fn handle(&self, report: &RunReport) {
        match report.verdict {
            Verdict::Success => info!("Run {} succeeded", report.run_id),
            Verdict::Escalated { reason } => {
                warn!("Run {} escalated: {}", report.run_id, reason)
            }
        }

        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(report).await {
                warn!("Notifier {} failed: {}", notifier.name(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ProjectProfile;
    use crate::pipeline::{EscalationReason, Verdict};
    use crate::plan::CommandPlan;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingNotifier {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _report: &RunReport) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Status { code: 502 })
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn report() -> RunReport {
        RunReport {
            run_id: "test-run".to_string(),
            repo_path: "/tmp/repo".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            profile: ProjectProfile::unknown("/tmp/repo".into()),
            plan: CommandPlan::default(),
            attempts: vec![],
            fix_summaries: vec![],
            verdict: Verdict::Escalated {
                reason: EscalationReason::NoToolchainDetected,
            },
            backend: None,
        }
    }

    #[tokio::test]
    async fn every_notifier_runs_despite_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = OutcomeHandler::new()
            .with_notifier(Box::new(CountingNotifier {
                calls: calls.clone(),
                fail: true,
            }))
            .with_notifier(Box::new(CountingNotifier {
                calls: calls.clone(),
                fail: false,
            }));

        handler.handle(&report()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn handler_with_no_notifiers_is_fine() {
        OutcomeHandler::new().handle(&report()).await;
    }
}

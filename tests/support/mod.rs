//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use buildmend::notify::{Notifier, NotifyError};
use buildmend::pipeline::{PipelineSettings, RunReport};
use buildmend::plan::Command;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Writes fixture files into `root`, creating parent directories.
pub fn write_fixture(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

/// Shell one-liner running in `cwd`.
pub fn sh(cwd: &Path, script: &str) -> Command {
    Command::new(&cwd.to_path_buf(), "sh", &["-c", script])
}

/// Settings with short timeouts suited to test commands.
pub fn test_settings(max_attempts: u32) -> PipelineSettings {
    PipelineSettings {
        max_attempts,
        command_timeout: Duration::from_secs(10),
        ..PipelineSettings::default()
    }
}

/// Records every report delivered to it.
pub struct RecordingNotifier {
    calls: AtomicUsize,
    reports: Mutex<Vec<RunReport>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reports: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().unwrap().clone()
    }
}

/// Adapter so a shared recorder can be registered as a boxed notifier.
pub struct SharedNotifier(pub Arc<RecordingNotifier>);

#[async_trait]
impl Notifier for SharedNotifier {
    async fn notify(&self, report: &RunReport) -> Result<(), NotifyError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.reports.lock().unwrap().push(report.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

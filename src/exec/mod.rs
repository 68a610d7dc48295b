//! Bounded process execution
//!
//! The only place in the crate that touches external processes. Every
//! invocation yields a well-formed [`ExecutionOutcome`], including spawn
//! failures and timeouts; callers never see an `Err` from a failing build
//! command. Output capture is capped per stream, and a hard wall-clock
//! timeout kills the process group so no children survive the run.

use crate::plan::Command;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Exit code reported when the command could not be spawned at all.
const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Captured result of one command invocation. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Combined diagnostic text for remediation, stderr last since build
    /// tools put the interesting lines there.
    pub fn diagnostic_text(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", "") if self.timed_out => "command timed out with no output".to_string(),
            ("", "") => "command produced no output".to_string(),
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }

    fn spawn_failure(message: String, elapsed: Duration) -> Self {
        Self {
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: message,
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: elapsed.as_millis() as u64,
            timed_out: false,
        }
    }
}

/// Executes commands with bounded output capture and a hard timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }

    /// Runs the command in its working directory.
    ///
    /// On timeout the process group is forcibly terminated and the outcome
    /// carries `timed_out = true` with a failing exit code. Captured text may
    /// be incomplete when the truncation flags are set.
    pub async fn run(&self, command: &Command) -> ExecutionOutcome {
        debug!("Running: {} (cwd {})", command, command.cwd.display());
        let start = Instant::now();

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", command.program, e);
                return ExecutionOutcome::spawn_failure(
                    format!("failed to spawn {}: {}", command.program, e),
                    start.elapsed(),
                );
            }
        };

        let cap = self.max_output_bytes;
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_task = tokio::spawn(read_capped(stdout_pipe, cap));
        let stderr_task = tokio::spawn(read_capped(stderr_pipe, cap));

        let (exit_code, timed_out) = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code().unwrap_or(-1), false),
            Ok(Err(e)) => {
                warn!("Waiting on {} failed: {}", command.program, e);
                (-1, false)
            }
            Err(_) => {
                warn!(
                    "Command {} exceeded timeout of {:?}, killing process group",
                    command.program, self.timeout
                );
                kill_process_tree(&mut child).await;
                (-1, true)
            }
        };

        // Readers hit EOF once the process group is gone.
        let (stdout, stdout_truncated) = stdout_task
            .await
            .unwrap_or_else(|_| (String::new(), false));
        let (stderr, stderr_truncated) = stderr_task
            .await
            .unwrap_or_else(|_| (String::new(), false));

        let outcome = ExecutionOutcome {
            exit_code,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            duration_ms: start.elapsed().as_millis() as u64,
            timed_out,
        };
        debug!(
            "Command {} finished: exit={} timed_out={} in {}ms",
            command.program, outcome.exit_code, outcome.timed_out, outcome.duration_ms
        );
        outcome
    }
}

/// Reads a pipe to EOF, retaining at most `cap` bytes.
///
/// Draining past the cap matters: stopping early would block the child on a
/// full pipe.
async fn read_capped<R>(pipe: Option<R>, cap: usize) -> (String, bool)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let Some(mut pipe) = pipe else {
        return (String::new(), false);
    };
    let mut kept: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if kept.len() < cap {
                    let take = n.min(cap - kept.len());
                    kept.extend_from_slice(&buf[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    (String::from_utf8_lossy(&kept).into_owned(), truncated)
}

async fn kill_process_tree(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The child leads its own process group, so signal the whole group.
        let _ = std::process::Command::new("kill")
            .args(["-KILL", "--", &format!("-{}", pid)])
            .status();
    }
    if let Err(e) = child.kill().await {
        warn!("Kill after timeout failed: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> Command {
        Command {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            cwd: PathBuf::from("."),
        }
    }

    fn runner() -> ProcessRunner {
        ProcessRunner::new(Duration::from_secs(5), 64 * 1024)
    }

    #[tokio::test]
    async fn captures_exit_code_and_streams() {
        let outcome = runner().run(&sh("echo out; echo err >&2; exit 3")).await;
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.stdout.trim(), "out");
        assert_eq!(outcome.stderr.trim(), "err");
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn zero_exit_succeeds() {
        let outcome = runner().run(&sh("true")).await;
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn timeout_kills_and_flags() {
        let runner = ProcessRunner::new(Duration::from_millis(200), 64 * 1024);
        let start = Instant::now();
        let outcome = runner.run(&sh("sleep 30")).await;
        assert!(outcome.timed_out);
        assert!(!outcome.succeeded());
        // Well under the sleep duration: the process did not run to completion.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn timeout_leaves_no_process_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let pidfile = dir.path().join("pid");
        let script = format!("echo $$ > {}; sleep 30", pidfile.display());

        let runner = ProcessRunner::new(Duration::from_millis(200), 64 * 1024);
        let outcome = runner.run(&sh(&script)).await;
        assert!(outcome.timed_out);

        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let alive = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .unwrap()
            .success();
        assert!(!alive, "pid {} survived the timeout", pid);
    }

    #[tokio::test]
    async fn output_is_capped_with_truncation_flag() {
        let runner = ProcessRunner::new(Duration::from_secs(5), 1000);
        let outcome = runner
            .run(&sh("head -c 100000 /dev/zero | tr '\\0' 'x'"))
            .await;
        assert!(outcome.succeeded());
        assert!(outcome.stdout.len() <= 1000);
        assert!(outcome.stdout_truncated);
    }

    #[tokio::test]
    async fn missing_program_is_a_failing_outcome() {
        let command = Command {
            program: "definitely-not-a-real-program".to_string(),
            args: vec![],
            cwd: PathBuf::from("."),
        };
        let outcome = runner().run(&command).await;
        assert!(!outcome.succeeded());
        assert_eq!(outcome.exit_code, 127);
        assert!(outcome.stderr.contains("failed to spawn"));
    }

    #[test]
    fn diagnostic_text_prefers_both_streams() {
        let outcome = ExecutionOutcome {
            exit_code: 1,
            stdout: "building...".to_string(),
            stderr: "error: missing symbol X".to_string(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: 10,
            timed_out: false,
        };
        let text = outcome.diagnostic_text();
        assert!(text.contains("building..."));
        assert!(text.ends_with("error: missing symbol X"));
    }
}

//! End-to-end pipeline tests
//!
//! These run the full retry state machine against throwaway repositories
//! with shell-script build commands and a scripted fix backend.

#![cfg(unix)]

mod support;

use buildmend::ai::mock::MockFixBackend;
use buildmend::ai::BackendError;
use buildmend::classify::{ProjectKind, ProjectProfile};
use buildmend::notify::OutcomeHandler;
use buildmend::pipeline::{BuildPipeline, EscalationReason, Verdict};
use buildmend::plan::CommandPlan;
use buildmend::remedy::types::{FileEdit, FixResponse};
use std::fs;
use std::sync::Arc;
use support::{sh, test_settings, write_fixture, RecordingNotifier, SharedNotifier};
use tempfile::TempDir;

fn profile(repo: &TempDir) -> ProjectProfile {
    ProjectProfile {
        kind: ProjectKind::Python,
        package_manager: None,
        tool_version_hint: None,
        root_path: repo.path().to_path_buf(),
    }
}

fn fix_creating(path: &str, content: &str, rationale: &str) -> FixResponse {
    FixResponse {
        fixable: true,
        rationale: rationale.to_string(),
        edits: vec![FileEdit {
            path: path.to_string(),
            content: content.to_string(),
        }],
    }
}

#[tokio::test]
async fn clean_run_notifies_once_and_never_remediates() {
    let repo = TempDir::new().unwrap();
    let backend = Arc::new(MockFixBackend::new());
    let recorder = RecordingNotifier::new();

    let plan = CommandPlan {
        install_commands: vec![sh(repo.path(), "true")],
        build_command: Some(sh(repo.path(), "true")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3)).with_handler(
        OutcomeHandler::new().with_notifier(Box::new(SharedNotifier(recorder.clone()))),
    );
    let report = pipeline.run_planned(profile(&repo), plan).await;

    assert_eq!(report.verdict, Verdict::Success);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(backend.call_count(), 0);
    assert_eq!(recorder.call_count(), 1);
    assert_eq!(recorder.reports()[0].run_id, report.run_id);
}

#[tokio::test]
async fn single_fix_turns_the_build_green() {
    let repo = TempDir::new().unwrap();
    let backend = Arc::new(MockFixBackend::new());
    backend.push_response(Ok(fix_creating("marker", "ready", "create the marker file")));

    let plan = CommandPlan {
        install_commands: vec![],
        build_command: Some(sh(repo.path(), "grep -q ready marker")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3));
    let report = pipeline.run_planned(profile(&repo), plan).await;

    assert_eq!(report.verdict, Verdict::Success);
    assert_eq!(report.fix_attempt_count(), 1);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(backend.call_count(), 1);
    assert!(report.backend.is_some());
}

#[tokio::test]
async fn exhausted_budget_escalates_with_bounded_builds() {
    let repo = TempDir::new().unwrap();
    let backend = Arc::new(MockFixBackend::new());
    for i in 0..3 {
        backend.push_response(Ok(fix_creating(
            "attempt",
            &i.to_string(),
            "bump the attempt marker",
        )));
    }
    let recorder = RecordingNotifier::new();

    let plan = CommandPlan {
        install_commands: vec![],
        build_command: Some(sh(repo.path(), "exit 1")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3)).with_handler(
        OutcomeHandler::new().with_notifier(Box::new(SharedNotifier(recorder.clone()))),
    );
    let report = pipeline.run_planned(profile(&repo), plan).await;

    assert_eq!(
        report.verdict,
        Verdict::Escalated {
            reason: EscalationReason::RetryBudgetExhausted
        }
    );
    // Initial build plus max_attempts remediated retries.
    assert_eq!(report.attempts.len(), 4);
    assert_eq!(backend.call_count(), 3);
    assert_eq!(report.fix_attempt_count(), 3);
    assert_eq!(recorder.call_count(), 1);
}

#[tokio::test]
async fn backend_outage_escalates_after_one_attempt() {
    let repo = TempDir::new().unwrap();
    let backend = Arc::new(MockFixBackend::new());
    backend.push_response(Err(BackendError::TimeoutError { seconds: 120 }));

    let plan = CommandPlan {
        install_commands: vec![],
        build_command: Some(sh(repo.path(), "exit 3")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3));
    let report = pipeline.run_planned(profile(&repo), plan).await;

    assert_eq!(
        report.verdict,
        Verdict::Escalated {
            reason: EscalationReason::RemediationUnavailable
        }
    );
    assert_eq!(report.attempts.len(), 1);
    assert!(report.fix_summaries.is_empty());
}

#[tokio::test]
async fn unknown_repository_escalates_without_executing() {
    let repo = TempDir::new().unwrap();
    write_fixture(repo.path(), &[("README.md", "nothing to build here\n")]);
    let backend = Arc::new(MockFixBackend::new());
    let recorder = RecordingNotifier::new();

    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3)).with_handler(
        OutcomeHandler::new().with_notifier(Box::new(SharedNotifier(recorder.clone()))),
    );
    let report = pipeline.run(repo.path()).await;

    assert_eq!(
        report.verdict,
        Verdict::Escalated {
            reason: EscalationReason::NoToolchainDetected
        }
    );
    assert!(report.attempts.is_empty());
    assert_eq!(backend.call_count(), 0);
    assert_eq!(recorder.call_count(), 1);
}

#[tokio::test]
async fn previous_fixes_are_threaded_into_later_requests() {
    let repo = TempDir::new().unwrap();
    let backend = Arc::new(MockFixBackend::new());
    backend.push_response(Ok(fix_creating("one", "1", "first fix")));
    backend.push_response(Ok(fix_creating("two", "2", "second fix")));

    // Succeeds only once both fixes have landed.
    let plan = CommandPlan {
        install_commands: vec![],
        build_command: Some(sh(repo.path(), "test -f one && test -f two")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3));
    let report = pipeline.run_planned(profile(&repo), plan).await;

    assert_eq!(report.verdict, Verdict::Success);
    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].previous_fix_summaries.is_empty());
    assert_eq!(requests[1].previous_fix_summaries.len(), 1);
    assert!(requests[1].previous_fix_summaries[0].contains("first fix"));
}

#[tokio::test]
async fn rejected_patch_set_leaves_the_tree_untouched() {
    let repo = TempDir::new().unwrap();
    write_fixture(repo.path(), &[("src/app.py", "print('v1')\n")]);
    let backend = Arc::new(MockFixBackend::new());
    backend.push_response(Ok(FixResponse {
        fixable: true,
        rationale: "rewrite app and leak a file".to_string(),
        edits: vec![
            FileEdit {
                path: "src/app.py".to_string(),
                content: "print('v2')\n".to_string(),
            },
            FileEdit {
                path: "../outside.txt".to_string(),
                content: "escaped".to_string(),
            },
        ],
    }));

    let plan = CommandPlan {
        install_commands: vec![],
        build_command: Some(sh(repo.path(), "exit 1")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3));
    let report = pipeline.run_planned(profile(&repo), plan).await;

    assert_eq!(
        report.verdict,
        Verdict::Escalated {
            reason: EscalationReason::RemediationUnavailable
        }
    );
    assert_eq!(
        fs::read_to_string(repo.path().join("src/app.py")).unwrap(),
        "print('v1')\n"
    );
    assert!(!repo.path().parent().unwrap().join("outside.txt").exists());
}

#[tokio::test]
async fn repeated_runs_on_a_green_repo_stay_green() {
    let repo = TempDir::new().unwrap();
    let backend = Arc::new(MockFixBackend::new());

    let plan = CommandPlan {
        install_commands: vec![sh(repo.path(), "true")],
        build_command: Some(sh(repo.path(), "true")),
    };
    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3));

    for _ in 0..2 {
        let report = pipeline
            .run_planned(profile(&repo), plan.clone())
            .await;
        assert_eq!(report.verdict, Verdict::Success);
        assert_eq!(report.fix_attempt_count(), 0);
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn full_run_classifies_real_fingerprints() {
    // A repository whose planned commands are real but unavailable still
    // terminates with a bounded escalation rather than hanging.
    let repo = TempDir::new().unwrap();
    write_fixture(
        repo.path(),
        &[("Gemfile", "source 'https://rubygems.org'\n")],
    );
    let backend = Arc::new(MockFixBackend::new());
    backend.push_response(Ok(FixResponse::unfixable("toolchain is not installed")));

    let pipeline = BuildPipeline::new(backend.clone(), test_settings(3));
    let report = pipeline.run(repo.path()).await;

    assert_eq!(report.profile.kind, ProjectKind::Ruby);
    match report.verdict {
        Verdict::Escalated { .. } => {}
        Verdict::Success => panic!("bundle install cannot succeed in this environment"),
    }
}

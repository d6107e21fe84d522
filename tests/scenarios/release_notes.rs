//! Test: Release Notes - the workflow records a release only when the task succeeds

use crate::helpers::*;
use chrono::NaiveDate;
use release_runner::notes::FixedClock;
use release_runner::output::{BufferSink, OutputSession};
use release_runner::release::{ReleaseError, ReleaseRequest, ReleaseWorkflow};
use std::sync::Arc;

fn clock() -> Arc<FixedClock> {
    let at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    Arc::new(FixedClock(at))
}

fn request(version: &str, records: &[&str]) -> ReleaseRequest {
    ReleaseRequest {
        task: "release".to_string(),
        version: version.to_string(),
        records: records.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_successful_release_writes_notes() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = ReleaseWorkflow::new(three_step_config(), dir.path(), MockExecutor::succeeding())
        .with_clock(clock());
    let session = OutputSession::active(Arc::new(BufferSink::new()));

    let report = workflow
        .release(&request("1.2.0", &["1. fix login bug", "2. add dark mode"]), &session)
        .await
        .unwrap();

    let path = dir.path().join("release.md");
    assert_eq!(report.notes_path.as_deref(), Some(path.as_path()));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "# Release Log\n\n## v1.2.0\n\n**Release time: 2024-03-01 09:30:00**\n\n1. fix login bug\n2. add dark mode\n\n"
    );
}

#[tokio::test]
async fn test_failed_release_leaves_notes_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("release.md");
    std::fs::write(&path, "# Release Log\n\n## v1.0.0\n\n1. first\n").unwrap();

    let executor = MockExecutor::new(vec![MockCommand::exit(0), MockCommand::exit(1)]);
    let workflow = ReleaseWorkflow::new(three_step_config(), dir.path(), executor.clone())
        .with_clock(clock());
    let session = OutputSession::active(Arc::new(BufferSink::new()));

    let err = workflow
        .release(&request("1.1.0", &["1. second"]), &session)
        .await
        .unwrap_err();

    match err {
        ReleaseError::StepFailure { index, step, .. } => {
            assert_eq!(index, 1);
            assert_eq!(step, "Build");
        }
        other => panic!("expected step failure, got {}", other),
    }
    assert_eq!(executor.commands().len(), 2);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "# Release Log\n\n## v1.0.0\n\n1. first\n"
    );
}

#[tokio::test]
async fn test_testing_release_uses_testing_file() {
    let dir = tempfile::tempdir().unwrap();
    let executor = MockExecutor::succeeding();
    let workflow = ReleaseWorkflow::new(three_step_config(), dir.path(), executor.clone())
        .with_clock(clock());
    let session = OutputSession::active(Arc::new(BufferSink::new()));

    let report = workflow
        .release(&request("2.0.0-testing", &["try it"]), &session)
        .await
        .unwrap();

    assert_eq!(
        report.notes_path,
        Some(dir.path().join("release-testing.md"))
    );
    assert!(!dir.path().join("release.md").exists());
    assert_eq!(executor.commands()[2], "upload --release 2.0.0");

    let notes = std::fs::read_to_string(dir.path().join("release-testing.md")).unwrap();
    assert!(notes.contains("## v2.0.0-testing"));
    assert!(notes.contains("1. try it"));
}

#[tokio::test]
async fn test_newest_release_goes_first() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = ReleaseWorkflow::new(three_step_config(), dir.path(), MockExecutor::succeeding())
        .with_clock(clock());
    let session = OutputSession::active(Arc::new(BufferSink::new()));

    workflow.release(&request("1.0.0", &["first"]), &session).await.unwrap();
    workflow.release(&request("1.1.0", &["second"]), &session).await.unwrap();

    let notes = std::fs::read_to_string(dir.path().join("release.md")).unwrap();
    let newer = notes.find("## v1.1.0").unwrap();
    let older = notes.find("## v1.0.0").unwrap();
    assert!(newer < older);
    assert!(notes.starts_with("# Release Log\n"));
}

#[tokio::test]
async fn test_skip_notes_runs_task_only() {
    let dir = tempfile::tempdir().unwrap();
    let executor = MockExecutor::succeeding();
    let workflow = ReleaseWorkflow::new(three_step_config(), dir.path(), executor.clone());
    let session = OutputSession::active(Arc::new(BufferSink::new()));

    let mut req = request("1.0.0", &["x"]);
    req.skip_notes = true;
    let report = workflow.release(&req, &session).await.unwrap();

    assert!(report.notes_path.is_none());
    assert_eq!(executor.commands().len(), 3);
    assert!(!dir.path().join("release.md").exists());
}

#[tokio::test]
async fn test_summary_variable_holds_cleaned_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_from_json(
        r#"{ "settle_delay_ms": 0, "tasks": [ { "name": "release", "title": "Release", "steps": [
            { "title": "Log", "command": "log '${summary}'" } ] } ] }"#,
    );
    let executor = MockExecutor::succeeding();
    let workflow = ReleaseWorkflow::new(config, dir.path(), executor.clone()).with_clock(clock());
    let session = OutputSession::active(Arc::new(BufferSink::new()));

    workflow
        .release(&request("1.0.0", &["  1. fix  ", "", "2. add"]), &session)
        .await
        .unwrap();

    assert_eq!(executor.commands(), vec!["log 'fix\nadd'"]);
}

#[test]
fn test_notes_without_task() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = ReleaseWorkflow::new(three_step_config(), dir.path(), MockExecutor::succeeding())
        .with_clock(clock());

    let (path, preview) = workflow
        .preview_notes("3.0.0", &["hotfix".to_string()])
        .unwrap();
    assert!(!path.exists());
    assert!(preview.contains("## v3.0.0\n\n**Release time: 2024-03-01 09:30:00**\n\n1. hotfix\n"));

    let written = workflow.write_notes("3.0.0", &["hotfix".to_string()]).unwrap();
    assert_eq!(std::fs::read_to_string(written).unwrap(), preview);
}

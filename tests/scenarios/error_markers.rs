//! Test: Error Markers - output classification fails or hides chunks

use crate::helpers::*;
use release_runner::core::{FailureReason, RunContext};

#[tokio::test]
async fn test_error_marker_fails_step_despite_exit_zero() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![
        MockCommand::ok("bumped\n"),
        MockCommand::ok("compiling\n")
            .stdout("[error] Module not found\n")
            .stdout("never delivered\n"),
    ]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_failed_at(
        &result,
        1,
        &FailureReason::ErrorMarker("[error]".to_string()),
    );
    assert_eq!(result.executor.calls()[1].delivered, 2);
    assert!(result.output.contains("[error] Module not found"));
    assert!(!result.output.contains("never delivered"));
}

#[tokio::test]
async fn test_progress_noise_on_stderr_is_suppressed() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![
        MockCommand::ok("bumped\n"),
        MockCommand::ok("start\n")
            .stderr("<s> [webpack.Progress] 45% building modules\n")
            .stderr("warning: large bundle\n"),
    ]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_completed(&result);
    assert!(!result.output.contains("webpack.Progress"));
    assert!(result.output.contains("warning: large bundle"));
}

#[tokio::test]
async fn test_noise_on_stdout_is_forwarded() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![MockCommand::ok("building release bundle\n")]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_completed(&result);
    assert!(result.output.contains("building release bundle"));
}

#[tokio::test]
async fn test_error_marker_wins_over_noise() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![
        MockCommand::exit(0).stderr("building... [error] out of memory\n"),
    ]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_failed_at(
        &result,
        0,
        &FailureReason::ErrorMarker("[error]".to_string()),
    );
}

#[tokio::test]
async fn test_configured_regex_marker() {
    let config = config_from_json(
        r#"{
  "settle_delay_ms": 0,
  "output": {
    "error_markers": [ "[error]", { "pattern": "npm ERR!\\s+code", "regex": true } ],
    "noise_markers": []
  },
  "tasks": [ { "name": "publish", "title": "Publish", "steps": [
    { "title": "Publish", "command": "npm publish" },
    { "title": "Tag", "command": "git tag" }
  ] } ]
}"#,
    );
    let executor = MockExecutor::new(vec![MockCommand::exit(0).stderr("npm ERR!  code E403\n")]);

    let result =
        run_task_with_mock(&config, "publish", RunContext::new("/proj", "1.0.0"), executor).await;

    assert_task_failed_at(
        &result,
        0,
        &FailureReason::ErrorMarker(r"npm ERR!\s+code".to_string()),
    );
}

#[tokio::test]
async fn test_marker_split_across_reads_fails_step() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![MockCommand::ok("bundling [err")
        .stdout("or] chunk failed\n")
        .stdout("after the marker\n")]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_failed_at(
        &result,
        0,
        &FailureReason::ErrorMarker("[error]".to_string()),
    );
    assert_eq!(result.executor.calls()[0].delivered, 2);
    assert!(!result.output.contains("after the marker"));
}

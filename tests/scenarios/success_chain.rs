//! Test: Success Chain - every step runs, in order, in the workspace root

use crate::helpers::*;
use release_runner::core::RunContext;

#[tokio::test]
async fn test_three_steps_run_in_order() {
    let config = three_step_config();
    let context = RunContext::new("/proj", "1.2.0");

    let result = run_task_with_mock(&config, "release", context, MockExecutor::succeeding()).await;

    assert_task_completed(&result);
    assert_commands(
        &result,
        &["npm version 1.2.0", "npm run build", "upload --release 1.2.0"],
    );
    assert!(result
        .executor
        .calls()
        .iter()
        .all(|call| call.cwd.to_str() == Some("/proj")));
}

#[tokio::test]
async fn test_step_output_reaches_session() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![
        MockCommand::ok("v1.2.0\n"),
        MockCommand::ok("compiled 42 modules\n"),
        MockCommand::ok("uploaded\n"),
    ]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_completed(&result);
    for expected in ["v1.2.0", "compiled 42 modules", "uploaded", "$ npm run build"] {
        assert!(
            result.output.contains(expected),
            "output should contain '{}':\n{}",
            expected,
            result.output
        );
    }
}

#[tokio::test]
async fn test_progress_tracks_completed_steps() {
    let config = three_step_config();
    let result = run_task_with_mock(
        &config,
        "release",
        RunContext::new("/proj", "1.2.0"),
        MockExecutor::succeeding(),
    )
    .await;

    let outcome = result.outcome();
    assert_eq!(outcome.state.total_steps, 3);
    assert_eq!(outcome.state.completed_steps, 3);
    assert!((outcome.state.progress() - 1.0).abs() < f64::EPSILON);
    assert!(outcome.state.completed_at.is_some());
}

//! Test: Failure Handling - the first failing step ends the run

use crate::helpers::*;
use release_runner::core::{FailureReason, RunContext};
use release_runner::execution::RunError;

/// Exit code 1 at step 2 of 3: step 3 never starts
#[tokio::test]
async fn test_nonzero_exit_stops_run() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![MockCommand::exit(0), MockCommand::exit(1)]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_failed_at(&result, 1, &FailureReason::ExitCode(1));
    assert_eq!(result.outcome().exit_code(), Some(1));
    assert_commands(&result, &["npm version 1.2.0", "npm run build"]);
    assert!(result.output.contains("Step 'Build' failed"));
}

#[tokio::test]
async fn test_first_step_failure() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![MockCommand::exit(127)]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    assert_task_failed_at(&result, 0, &FailureReason::ExitCode(127));
    assert_eq!(result.outcome().state.completed_steps, 0);
    assert_eq!(result.outcome().state.failed_step, Some(0));
}

#[tokio::test]
async fn test_spawn_error_is_distinct_from_failure() {
    let config = three_step_config();
    let executor = MockExecutor::new(vec![MockCommand::ok("ok\n"), MockCommand::spawn_error()]);

    let result =
        run_task_with_mock(&config, "release", RunContext::new("/proj", "1.2.0"), executor).await;

    match &result.outcome {
        Err(RunError::Spawn { index, title, .. }) => {
            assert_eq!(*index, 1);
            assert_eq!(title, "Build");
        }
        other => panic!("expected spawn error, got {:?}", other.as_ref().map(|o| o.status())),
    }
    assert_eq!(result.commands().len(), 2);
}

#[tokio::test]
async fn test_failed_run_releases_task_name() {
    let config = three_step_config();
    let definition = config.task_definition("release").unwrap();
    let runner = release_runner::execution::TaskRunner::new(MockExecutor::new(vec![
        MockCommand::exit(2),
    ]))
    .with_settle_delay(std::time::Duration::ZERO);
    let session = release_runner::output::OutputSession::active(std::sync::Arc::new(
        release_runner::output::NoopSink,
    ));

    let first = runner
        .run(&definition, &RunContext::new("/proj", "1.0.0"), &session)
        .await
        .unwrap();
    assert!(!first.is_success());
    assert!(!runner.in_flight().is_running("release"));

    let second = runner
        .run(&definition, &RunContext::new("/proj", "1.0.0"), &session)
        .await
        .unwrap();
    assert!(second.is_success());
}

/// A second run of the same task while the first is in flight is rejected
#[tokio::test]
async fn test_concurrent_run_of_same_task_rejected() {
    let config = three_step_config();
    let definition = config.task_definition("release").unwrap();
    let executor = MockExecutor::succeeding().with_delay(std::time::Duration::from_millis(50));
    let runner = release_runner::execution::TaskRunner::new(executor.clone())
        .with_settle_delay(std::time::Duration::ZERO);
    let session = release_runner::output::OutputSession::active(std::sync::Arc::new(
        release_runner::output::NoopSink,
    ));
    let context = RunContext::new("/proj", "1.0.0");

    let (first, second) = tokio::join!(
        runner.run(&definition, &context, &session),
        runner.run(&definition, &context, &session)
    );

    assert!(first.unwrap().is_success());
    match second {
        Err(RunError::AlreadyRunning(task)) => assert_eq!(task, "release"),
        other => panic!("expected AlreadyRunning, got {:?}", other.map(|o| o.status())),
    }
    assert_eq!(executor.commands().len(), 3);
    assert!(!runner.in_flight().is_running("release"));

    let again = runner.run(&definition, &context, &session).await.unwrap();
    assert!(again.is_success());
}

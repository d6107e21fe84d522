//! Test utility functions for release-runner
#![allow(dead_code)]

use async_trait::async_trait;
use release_runner::core::{ExecutionStatus, FailureReason, ReleaseConfig, RunContext, StepState};
use release_runner::execution::{
    ChunkAction, ChunkHandler, CommandExecutor, CommandExit, RunError, RunOutcome, SpawnError,
    StreamKind, TaskRunner,
};
use release_runner::output::{BufferSink, OutputSession};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a mocked command prints and how it exits
#[derive(Debug, Clone)]
pub struct MockCommand {
    pub chunks: Vec<(StreamKind, String)>,
    pub exit_code: i32,
    pub spawn_error: bool,
}

impl MockCommand {
    pub fn ok(stdout: &str) -> Self {
        Self {
            chunks: vec![(StreamKind::Stdout, stdout.to_string())],
            exit_code: 0,
            spawn_error: false,
        }
    }

    pub fn exit(code: i32) -> Self {
        Self {
            chunks: Vec::new(),
            exit_code: code,
            spawn_error: false,
        }
    }

    pub fn spawn_error() -> Self {
        Self {
            chunks: Vec::new(),
            exit_code: 0,
            spawn_error: true,
        }
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.chunks.push((StreamKind::Stderr, text.to_string()));
        self
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.chunks.push((StreamKind::Stdout, text.to_string()));
        self
    }
}

/// One command the mock was asked to run
#[derive(Debug, Clone)]
pub struct MockCall {
    pub command: String,
    pub cwd: PathBuf,
    /// Chunks delivered before the handler aborted (or all of them)
    pub delivered: usize,
}

/// Executor that replays scripted commands; missing scripts exit 0
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    script: Arc<Vec<MockCommand>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    delay: Option<Duration>,
}

impl MockExecutor {
    pub fn new(script: Vec<MockCommand>) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Make every command take `delay` before it starts producing output
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every step succeeds
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        handler: &dyn ChunkHandler,
    ) -> Result<CommandExit, SpawnError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let index = self.calls.lock().unwrap().len();
        let scripted = self
            .script
            .get(index)
            .cloned()
            .unwrap_or_else(|| MockCommand::exit(0));

        let mut call = MockCall {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            delivered: 0,
        };

        if scripted.spawn_error {
            self.calls.lock().unwrap().push(call);
            return Err(SpawnError::Io {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such shell"),
            });
        }

        for (stream, chunk) in &scripted.chunks {
            call.delivered += 1;
            if handler.on_chunk(*stream, chunk) == ChunkAction::Abort {
                self.calls.lock().unwrap().push(call);
                return Ok(CommandExit::Aborted);
            }
        }

        self.calls.lock().unwrap().push(call);
        Ok(CommandExit::Exited(scripted.exit_code))
    }
}

/// Result of running a task against a mock executor
pub struct TaskTestResult {
    pub outcome: Result<RunOutcome, RunError>,
    pub output: String,
    pub executor: MockExecutor,
}

impl TaskTestResult {
    pub fn outcome(&self) -> &RunOutcome {
        self.outcome
            .as_ref()
            .unwrap_or_else(|e| panic!("run ended with error: {}", e))
    }

    pub fn commands(&self) -> Vec<String> {
        self.executor.commands()
    }
}

/// Parse a JSON config, panicking on errors
pub fn config_from_json(json: &str) -> ReleaseConfig {
    ReleaseConfig::from_json(json).unwrap_or_else(|e| panic!("invalid config: {:#}", e))
}

/// Run `task` from `config` through a mock executor and a buffered session
pub async fn run_task_with_mock(
    config: &ReleaseConfig,
    task: &str,
    context: RunContext,
    executor: MockExecutor,
) -> TaskTestResult {
    let definition = config
        .task_definition(task)
        .unwrap_or_else(|| panic!("Task '{}' not found", task));

    let runner = TaskRunner::new(executor.clone())
        .with_filter(config.output_filter())
        .with_settle_delay(Duration::ZERO);

    let sink = Arc::new(BufferSink::new());
    let session = OutputSession::active(sink.clone());
    let outcome = runner.run(&definition, &context, &session).await;

    TaskTestResult {
        outcome,
        output: sink.contents(),
        executor,
    }
}

/// Assert the task completed and every step ran
pub fn assert_task_completed(result: &TaskTestResult) {
    let outcome = result.outcome();
    assert_eq!(
        outcome.status(),
        ExecutionStatus::Completed,
        "Task should have completed, failure: {:?}",
        outcome.failure()
    );
    assert!(outcome
        .steps
        .iter()
        .all(|s| matches!(s.state, StepState::Completed { .. })));
}

/// Assert the task failed at step `index` for `reason`, with later steps never started
pub fn assert_task_failed_at(result: &TaskTestResult, index: usize, reason: &FailureReason) {
    let outcome = result.outcome();
    assert_eq!(outcome.status(), ExecutionStatus::Failed);

    let (failed, _, actual) = outcome
        .failure()
        .unwrap_or_else(|| panic!("Task failed but no step recorded a failure"));
    assert_eq!(failed, index, "wrong failed step");
    assert_eq!(actual, reason);

    for step in &outcome.steps[index + 1..] {
        assert!(
            matches!(step.state, StepState::Pending) && step.command.is_none(),
            "Step '{}' should never have started",
            step.title
        );
    }
    assert_eq!(result.commands().len(), index + 1);
}

/// Assert the exact sequence of commands executed
pub fn assert_commands(result: &TaskTestResult, expected: &[&str]) {
    assert_eq!(result.commands(), expected, "Command sequence mismatch");
}

/// A three-step task config used by several scenarios
pub fn three_step_config() -> ReleaseConfig {
    config_from_json(
        r#"{
  "settle_delay_ms": 0,
  "tasks": [
    {
      "name": "release",
      "title": "Release",
      "steps": [
        { "title": "Bump", "command": "npm version ${version}" },
        { "title": "Build", "command": "npm run build" },
        { "title": "Upload", "command": "upload --release ${release_version}" }
      ]
    }
  ]
}"#,
    )
}

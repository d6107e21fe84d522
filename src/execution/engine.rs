//! Task runner - executes a task's steps one after another

use crate::{
    core::{
        ChunkClass, ExecutionStatus, FailureReason, OutputFilter, OutputScanner, RunContext,
        RunState, StepState, StreamKind, TaskDefinition,
    },
    execution::{
        executor::{ChunkAction, ChunkHandler, CommandExecutor, CommandExit, SpawnError},
        guard::InFlightRuns,
    },
    output::OutputSession,
};
use chrono::Utc;
use console::style;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum RunEvent {
    TaskStarted {
        execution_id: Uuid,
        task: String,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        title: String,
        command: String,
    },
    StepCompleted {
        index: usize,
        title: String,
    },
    StepFailed {
        index: usize,
        title: String,
        reason: FailureReason,
    },
    TaskFinished {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Errors that end a run without a normal outcome
#[derive(Debug, Error)]
pub enum RunError {
    #[error("task '{0}' is already running")]
    AlreadyRunning(String),

    #[error("step {} ({title}) could not be started: {source}", .index + 1)]
    Spawn {
        index: usize,
        title: String,
        #[source]
        source: SpawnError,
    },
}

/// One step as it was executed
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub title: String,

    /// Resolved command, `None` if the step was never reached
    pub command: Option<String>,

    pub state: StepState,
}

/// Result of a run that reached `Completed` or `Failed`
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub task: String,
    pub state: RunState,
    pub steps: Vec<StepRecord>,
}

impl RunOutcome {
    pub fn status(&self) -> ExecutionStatus {
        self.state.status
    }

    pub fn is_success(&self) -> bool {
        self.state.status == ExecutionStatus::Completed
    }

    /// Index, title and reason of the failed step
    pub fn failure(&self) -> Option<(usize, &str, &FailureReason)> {
        self.steps.iter().enumerate().find_map(|(i, step)| match &step.state {
            StepState::Failed { reason, .. } => Some((i, step.title.as_str(), reason)),
            _ => None,
        })
    }

    /// Exit code of the failed step, when it failed by exit code
    pub fn exit_code(&self) -> Option<i32> {
        self.failure().and_then(|(_, _, reason)| reason.exit_code())
    }

    /// Number of steps whose command was launched
    pub fn steps_started(&self) -> usize {
        self.steps.iter().filter(|s| s.command.is_some()).count()
    }
}

/// Runs tasks step by step through a [`CommandExecutor`]
pub struct TaskRunner<E> {
    executor: E,
    filter: OutputFilter,
    settle_delay: Duration,
    in_flight: InFlightRuns,
    event_handlers: Mutex<Vec<EventHandler>>,
}

impl<E: CommandExecutor> TaskRunner<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            filter: OutputFilter::default(),
            settle_delay: Duration::from_millis(crate::core::config::DEFAULT_SETTLE_DELAY_MS),
            in_flight: InFlightRuns::new(),
            event_handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_filter(mut self, filter: OutputFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Pause before the first step and before each command, giving the sink time to render
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Registry of in-flight runs
    pub fn in_flight(&self) -> &InFlightRuns {
        &self.in_flight
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.event_handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: RunEvent) {
        let handlers: Vec<EventHandler> = match self.event_handlers.lock() {
            Ok(handlers) => handlers.clone(),
            Err(_) => return,
        };
        for handler in handlers {
            handler(event.clone());
        }
    }

    async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    /// Run every step of `task` in order, stopping at the first failure
    ///
    /// Returns `Ok` with a `Completed` or `Failed` outcome, or `Err` when the
    /// task is already running or a command could not be launched.
    pub async fn run(
        &self,
        task: &TaskDefinition,
        context: &RunContext,
        session: &OutputSession,
    ) -> Result<RunOutcome, RunError> {
        let _guard = self
            .in_flight
            .try_acquire(&task.name)
            .ok_or_else(|| RunError::AlreadyRunning(task.name.clone()))?;

        let total = task.steps.len();
        let mut state = RunState::new();
        state.start(total);
        let execution_id = state.execution_id;

        let mut steps: Vec<StepRecord> = task
            .steps
            .iter()
            .map(|s| StepRecord {
                title: s.title.clone(),
                command: None,
                state: StepState::Pending,
            })
            .collect();

        info!("Starting task: {} ({})", task.name, execution_id);
        self.emit_event(RunEvent::TaskStarted {
            execution_id,
            task: task.name.clone(),
            total_steps: total,
        });
        session.writeln(&format!("Running {}", style(&task.title).bold()));

        self.settle().await;

        for (index, step) in task.steps.iter().enumerate() {
            // Resolved now, not at load time, so the latest context applies
            let variables = context.rendering_variables(task);
            let command = step.resolve(&variables);
            steps[index].command = Some(command.clone());

            session.writeln(&format!(
                "\n[{}/{}] {}",
                index + 1,
                total,
                style(&step.title).cyan()
            ));
            session.writeln(&format!("$ {}", command));

            info!("Step {}/{}: {}", index + 1, total, step.title);
            debug!("Resolved command: {}", command);
            self.emit_event(RunEvent::StepStarted {
                index,
                title: step.title.clone(),
                command: command.clone(),
            });

            let started_at = Utc::now();
            steps[index].state = StepState::Running { started_at };

            self.settle().await;

            let output = StepOutput::new(&self.filter, session);
            let exit = match self.executor.run(&command, context.root(), &output).await {
                Ok(exit) => exit,
                Err(source) => {
                    error!("Step {} could not be started: {}", step.title, source);
                    session.writeln(&style(format!("Could not start step: {}", source)).red().to_string());

                    let reason = FailureReason::Spawn(source.to_string());
                    steps[index].state = StepState::Failed {
                        reason: reason.clone(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    state.fail(index);
                    self.emit_event(RunEvent::StepFailed {
                        index,
                        title: step.title.clone(),
                        reason,
                    });
                    self.emit_event(RunEvent::TaskFinished {
                        execution_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(RunError::Spawn {
                        index,
                        title: step.title.clone(),
                        source,
                    });
                }
            };

            let failure = match (output.marker(), exit) {
                (Some(marker), _) => Some(FailureReason::ErrorMarker(marker)),
                (None, CommandExit::Exited(0)) => None,
                (None, CommandExit::Exited(code)) => Some(FailureReason::ExitCode(code)),
                (None, CommandExit::Aborted) => {
                    Some(FailureReason::ErrorMarker(String::from("aborted")))
                }
            };

            match failure {
                None => {
                    steps[index].state = StepState::Completed {
                        started_at,
                        completed_at: Utc::now(),
                    };
                    state.step_completed();
                    self.emit_event(RunEvent::StepCompleted {
                        index,
                        title: step.title.clone(),
                    });
                }
                Some(reason) => {
                    warn!("Step {} failed: {}", step.title, reason);
                    session.writeln(
                        &style(format!("\nStep '{}' failed: {}", step.title, reason))
                            .red()
                            .to_string(),
                    );

                    steps[index].state = StepState::Failed {
                        reason: reason.clone(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    state.fail(index);
                    self.emit_event(RunEvent::StepFailed {
                        index,
                        title: step.title.clone(),
                        reason,
                    });
                    break;
                }
            }
        }

        if state.status == ExecutionStatus::Running {
            state.complete();
            session.writeln(
                &style(format!("\n{} completed", task.title))
                    .green()
                    .to_string(),
            );
        }

        info!("Task {} finished: {:?}", task.name, state.status);
        self.emit_event(RunEvent::TaskFinished {
            execution_id,
            status: state.status,
        });

        Ok(RunOutcome {
            task: task.name.clone(),
            state,
            steps,
        })
    }
}

/// Routes one step's output chunks to the session
struct StepOutput<'a> {
    scanner: Mutex<OutputScanner<'a>>,
    session: &'a OutputSession,
    marker: Mutex<Option<String>>,
}

impl<'a> StepOutput<'a> {
    fn new(filter: &'a OutputFilter, session: &'a OutputSession) -> Self {
        Self {
            scanner: Mutex::new(filter.scanner()),
            session,
            marker: Mutex::new(None),
        }
    }

    /// Error marker seen in the output, if any
    fn marker(&self) -> Option<String> {
        self.marker.lock().ok().and_then(|m| m.clone())
    }

    fn forward(&self, stream: StreamKind, chunk: &str) {
        match stream {
            StreamKind::Stdout => self.session.write(chunk),
            StreamKind::Stderr => self.session.write(&style(chunk).red().to_string()),
        }
    }
}

impl ChunkHandler for StepOutput<'_> {
    fn on_chunk(&self, stream: StreamKind, chunk: &str) -> ChunkAction {
        let class = match self.scanner.lock() {
            Ok(mut scanner) => scanner.classify(stream, chunk),
            Err(_) => ChunkClass::Forward,
        };
        match class {
            ChunkClass::Forward => {
                self.forward(stream, chunk);
                ChunkAction::Continue
            }
            ChunkClass::Suppress => ChunkAction::Continue,
            ChunkClass::ErrorMarker(marker) => {
                self.forward(stream, chunk);
                warn!("Error marker '{}' in command output", marker);
                if let Ok(mut seen) = self.marker.lock() {
                    seen.get_or_insert(marker);
                }
                ChunkAction::Abort
            }
        }
    }
}

//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall task run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Idle,
    /// A step is currently running
    Running,
    /// All steps exited 0
    Completed,
    /// A step failed; later steps never ran
    Failed,
}

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Process exited non-zero (`-1` when killed by a signal)
    ExitCode(i32),
    /// Output contained an error marker; the process was killed
    ErrorMarker(String),
    /// The process could not be started
    Spawn(String),
}

impl FailureReason {
    /// Exit code, if the failure came from one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            FailureReason::ExitCode(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ExitCode(code) => write!(f, "exit code {}", code),
            FailureReason::ErrorMarker(marker) => write!(f, "error marker '{}' in output", marker),
            FailureReason::Spawn(e) => write!(f, "failed to start: {}", e),
        }
    }
}

/// State of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Not reached yet
    Pending,
    /// Process is running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Exited 0
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step failed
    Failed {
        reason: FailureReason,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Completed { .. } | StepState::Failed { .. })
    }
}

/// Overall run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of completed steps
    pub completed_steps: usize,

    /// Index of the step that failed, if any
    pub failed_step: Option<usize>,
}

impl RunState {
    /// Create a new run state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Idle,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            failed_step: None,
        }
    }

    /// Mark run as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Record a successful step
    pub fn step_completed(&mut self) {
        self.completed_steps += 1;
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed at `step`
    pub fn fail(&mut self, step: usize) {
        self.status = ExecutionStatus::Failed;
        self.failed_step = Some(step);
        self.completed_at = Some(Utc::now());
    }

    /// Calculate progress percentage (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

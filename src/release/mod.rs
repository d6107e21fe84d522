//! Release workflow - validate inputs, run the task, record the release
//!
//! A release is one task run plus one notes update. The notes file is read
//! before the run starts and written back (atomically, in full) only after
//! every step has succeeded.

pub mod files;

pub use files::{atomic_write, notes_file_for, package_version, read_notes, split_records};

use crate::{
    core::{FailureReason, ReleaseConfig, RunContext},
    execution::{CommandExecutor, RunError, RunOutcome, TaskRunner},
    notes::{clean_records, merge_with_default, Clock, SystemClock},
    output::OutputSession,
};
use console::style;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Error types for a release
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("{0}")]
    Validation(String),

    #[error("task '{0}' is already running")]
    AlreadyRunning(String),

    #[error(transparent)]
    Spawn(RunError),

    #[error("step {} ({step}) failed: {reason}", .index + 1)]
    StepFailure {
        index: usize,
        step: String,
        reason: FailureReason,
        outcome: Box<RunOutcome>,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Inputs for a release
#[derive(Debug, Clone, Default)]
pub struct ReleaseRequest {
    /// Task name from the configuration
    pub task: String,

    /// Version to release
    pub version: String,

    /// Raw release records, one change per entry
    pub records: Vec<String>,

    /// Variable overrides
    pub overrides: HashMap<String, String>,

    /// Skip updating the notes file
    pub skip_notes: bool,
}

/// What a successful release did
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub version: String,
    pub outcome: RunOutcome,

    /// Notes file written, `None` when notes were skipped
    pub notes_path: Option<PathBuf>,
}

/// Ties configuration, task runner and notes together for one workspace
pub struct ReleaseWorkflow<E> {
    config: ReleaseConfig,
    root: PathBuf,
    runner: TaskRunner<E>,
    clock: Arc<dyn Clock>,
}

impl<E: CommandExecutor> ReleaseWorkflow<E> {
    pub fn new(config: ReleaseConfig, root: impl Into<PathBuf>, executor: E) -> Self {
        let runner = TaskRunner::new(executor)
            .with_filter(config.output_filter())
            .with_settle_delay(config.settle_delay());

        Self {
            config,
            root: root.into(),
            runner,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different clock for note timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &TaskRunner<E> {
        &self.runner
    }

    /// Notes file a release of `version` writes to
    pub fn notes_path(&self, version: &str) -> PathBuf {
        notes_file_for(&self.root, &self.config.notes, version)
    }

    /// Run the release: task first, then the notes update
    pub async fn release(
        &self,
        request: &ReleaseRequest,
        session: &OutputSession,
    ) -> Result<ReleaseReport, ReleaseError> {
        let version = validate_version(&request.version)?;

        let task = self
            .config
            .task_definition(&request.task)
            .ok_or_else(|| {
                let known: Vec<&str> = self.config.tasks.iter().map(|t| t.name.as_str()).collect();
                ReleaseError::Validation(format!(
                    "unknown task '{}' (available: {})",
                    request.task,
                    known.join(", ")
                ))
            })?;

        let records = clean_records(&request.records);
        let notes_path = self.notes_path(version);
        let existing = if request.skip_notes {
            String::new()
        } else {
            read_notes(&notes_path).map_err(|source| ReleaseError::Io {
                path: notes_path.clone(),
                source,
            })?
        };

        let current_version = package_version(&self.root);
        let mut context = RunContext::new(&self.root, version)
            .with_records(records.clone())
            .with_testing_suffix(&self.config.notes.testing_suffix)
            .with_current_version(current_version.clone());
        context.overrides = request.overrides.clone();

        if let Some(current) = &current_version {
            session.writeln(&format!("Current version: {}", style(current).dim()));
        }
        session.writeln(&format!("Release version: {}", style(version).bold()));

        let outcome = self
            .runner
            .run(&task, &context, session)
            .await
            .map_err(|e| match e {
                RunError::AlreadyRunning(task) => ReleaseError::AlreadyRunning(task),
                spawn @ RunError::Spawn { .. } => ReleaseError::Spawn(spawn),
            })?;

        if let Some((index, step, reason)) = outcome.failure() {
            error!("Release {} failed at step {}", version, step);
            return Err(ReleaseError::StepFailure {
                index,
                step: step.to_string(),
                reason: reason.clone(),
                outcome: Box::new(outcome.clone()),
            });
        }

        let notes_path = if request.skip_notes {
            None
        } else {
            self.write_merged(&notes_path, &existing, version, &records)?;
            session.writeln(&format!("Release notes updated: {}", notes_path.display()));
            Some(notes_path)
        };

        info!("Release {} finished", version);
        Ok(ReleaseReport {
            version: version.to_string(),
            outcome,
            notes_path,
        })
    }

    /// Merged notes for `version` without touching the disk
    pub fn preview_notes(
        &self,
        version: &str,
        records: &[String],
    ) -> Result<(PathBuf, String), ReleaseError> {
        let version = validate_version(version)?;
        let path = self.notes_path(version);
        let existing = read_notes(&path).map_err(|source| ReleaseError::Io {
            path: path.clone(),
            source,
        })?;
        let merged = merge_with_default(
            &existing,
            &self.config.notes.default_document(),
            version,
            records,
            self.clock.as_ref(),
        );
        Ok((path, merged))
    }

    /// Merge an entry for `version` into its notes file, without running a task
    pub fn write_notes(&self, version: &str, records: &[String]) -> Result<PathBuf, ReleaseError> {
        let (path, merged) = self.preview_notes(version, records)?;
        atomic_write(&path, merged.as_bytes()).map_err(|source| ReleaseError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote release notes to {}", path.display());
        Ok(path)
    }

    fn write_merged(
        &self,
        path: &Path,
        existing: &str,
        version: &str,
        records: &[String],
    ) -> Result<(), ReleaseError> {
        let merged = merge_with_default(
            existing,
            &self.config.notes.default_document(),
            version,
            records,
            self.clock.as_ref(),
        );
        atomic_write(path, merged.as_bytes()).map_err(|source| ReleaseError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn validate_version(version: &str) -> Result<&str, ReleaseError> {
    let version = version.trim();
    if version.is_empty() {
        return Err(ReleaseError::Validation("a version is required".to_string()));
    }
    Ok(version)
}

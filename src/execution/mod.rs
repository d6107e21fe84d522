//! Execution - runs a task's steps as shell commands

pub mod engine;
pub mod executor;
pub mod guard;

pub use engine::{EventHandler, RunError, RunEvent, RunOutcome, StepRecord, TaskRunner};
pub use executor::{
    ChunkAction, ChunkHandler, CommandExecutor, CommandExit, ShellExecutor, SpawnError,
    Utf8ChunkDecoder,
};
pub use guard::{InFlightRuns, RunGuard};
pub use crate::core::StreamKind;

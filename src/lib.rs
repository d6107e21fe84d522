//! release-runner - runs release tasks and keeps a Markdown release log

pub mod cli;
pub mod core;
pub mod execution;
pub mod notes;
pub mod output;
pub mod release;

// Re-export commonly used types
pub use crate::core::{ExecutionStatus, ReleaseConfig, RunContext, StepDefinition, TaskDefinition};
pub use crate::execution::{CommandExecutor, RunEvent, RunOutcome, ShellExecutor, TaskRunner};
pub use crate::notes::{clean_records, merge, ReleaseDocument};
pub use crate::output::{OutputSession, OutputSink};
pub use crate::release::{ReleaseError, ReleaseReport, ReleaseRequest, ReleaseWorkflow};

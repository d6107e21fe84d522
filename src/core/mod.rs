//! Core domain models
//!
//! This module defines the configuration, tasks, steps, templates and
//! run state that the task runner works with.

pub mod config;
pub mod task;
pub mod condition;
pub mod context;
pub mod state;
pub mod template;

pub use config::ReleaseConfig;
pub use task::*;
pub use condition::{ChunkClass, ConditionPattern, OutputFilter, OutputScanner, StreamKind};
pub use context::*;
pub use state::*;
pub use template::{Template, TemplateError};

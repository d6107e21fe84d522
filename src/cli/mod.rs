//! Command-line interface

pub mod commands;
pub mod output;
pub mod terminal_output;

use clap::{Parser, Subcommand};
use commands::{ListCommand, NotesCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Release pipeline runner
#[derive(Debug, Parser, Clone)]
#[command(name = "release")]
#[command(version)]
#[command(about = "Runs release pipelines and keeps a Markdown release log", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to release configuration file (default: <root>/release.config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root; commands run here (default: current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a release task and update the release notes
    Run(RunCommand),

    /// Update the release notes without running a task
    Notes(NotesCommand),

    /// Validate a release configuration
    Validate(ValidateCommand),

    /// List configured tasks
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Workspace root, falling back to the current directory
    pub fn root(&self) -> std::io::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }

    /// Config file path, relative paths resolved against `root`
    pub fn config_path(&self, root: &std::path::Path) -> PathBuf {
        match &self.config {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root.join(path),
            None => root.join(crate::core::config::DEFAULT_CONFIG_FILE),
        }
    }
}

//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a release task
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Task name from the configuration
    pub task: String,

    /// Version to release (a `-testing` suffix selects the testing notes file)
    #[arg(long)]
    pub version: String,

    /// Release record (repeatable), e.g. "1. fix login bug"
    #[arg(short, long)]
    pub record: Vec<String>,

    /// File with one release record per line
    #[arg(long)]
    pub records_file: Option<PathBuf>,

    /// Variable overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub var: Vec<(String, String)>,

    /// Don't update the release notes
    #[arg(long)]
    pub no_notes: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub hold: bool,
}

/// Update the release notes only
#[derive(Debug, Args, Clone)]
pub struct NotesCommand {
    /// Version to record
    #[arg(long)]
    pub version: String,

    /// Release record (repeatable)
    #[arg(short, long)]
    pub record: Vec<String>,

    /// File with one release record per line
    #[arg(long)]
    pub records_file: Option<PathBuf>,

    /// Print the merged document instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Validate a release configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List configured tasks
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show each task's steps
    #[arg(long)]
    pub steps: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

//! Run context - the variables a run's command templates are rendered against

use crate::core::task::TaskDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Names bound by the runner; configuration may not set them
pub const RESERVED_VARIABLES: &[&str] = &[
    "root",
    "version",
    "summary",
    "release_version",
    "testing",
    "current_version",
];

/// Execution context for a task run
///
/// Holds the workspace root, the run-time inputs, and any variable
/// overrides given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Workspace root; every command runs here and `${root}` points here
    pub root: PathBuf,

    /// Version being released (`${version}`)
    pub version: String,

    /// Cleaned release records, joined into `${summary}`
    pub records: Vec<String>,

    /// Suffix marking a testing build
    pub testing_suffix: String,

    /// Version currently in `package.json`, if any
    pub current_version: Option<String>,

    /// Command-line overrides, applied over task variables
    pub overrides: HashMap<String, String>,
}

impl RunContext {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
            records: Vec::new(),
            testing_suffix: "-testing".to_string(),
            current_version: None,
            overrides: HashMap::new(),
        }
    }

    pub fn with_records(mut self, records: Vec<String>) -> Self {
        self.records = records;
        self
    }

    pub fn with_testing_suffix(mut self, suffix: &str) -> Self {
        self.testing_suffix = suffix.to_string();
        self
    }

    pub fn with_current_version(mut self, version: Option<String>) -> Self {
        self.current_version = version;
        self
    }

    pub fn with_override(mut self, key: &str, value: &str) -> Self {
        self.overrides.insert(key.to_string(), value.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the version marks a testing build
    pub fn is_testing(&self) -> bool {
        !self.testing_suffix.is_empty() && self.version.ends_with(&self.testing_suffix)
    }

    /// Version with the testing suffix removed
    pub fn release_version(&self) -> &str {
        if self.is_testing() {
            &self.version[..self.version.len() - self.testing_suffix.len()]
        } else {
            &self.version
        }
    }

    /// Records joined one per line
    pub fn summary(&self) -> String {
        self.records.join("\n")
    }

    /// All variables for template rendering
    ///
    /// Precedence, lowest first: task variables, overrides, reserved names.
    pub fn rendering_variables(&self, task: &TaskDefinition) -> HashMap<String, String> {
        let mut vars = task.variables.clone();
        vars.extend(self.overrides.clone());

        vars.insert("root".to_string(), self.root.display().to_string());
        vars.insert("version".to_string(), self.version.clone());
        vars.insert("summary".to_string(), self.summary());
        vars.insert("release_version".to_string(), self.release_version().to_string());
        vars.insert("testing".to_string(), self.is_testing().to_string());
        vars.insert(
            "current_version".to_string(),
            self.current_version.clone().unwrap_or_default(),
        );

        vars
    }
}

//! Release configuration from JSON (or YAML)

use crate::core::{
    condition::{ConditionPattern, OutputFilter},
    context::RESERVED_VARIABLES,
    task::TaskDefinition,
    template::Template,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the workspace root
pub const DEFAULT_CONFIG_FILE: &str = "release.config.json";

/// Default delay before the first step and before each command
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Top-level release configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Variables shared by every task
    #[serde(default)]
    variables: HashMap<String, Value>,

    /// Pause before the first step and before each command (milliseconds)
    #[serde(default)]
    pub settle_delay_ms: Option<u64>,

    /// Output classification markers
    #[serde(default)]
    pub output: OutputConfig,

    /// Release notes file settings
    #[serde(default)]
    pub notes: NotesConfig,

    /// Named tasks, in the order they are listed
    pub tasks: Vec<TaskConfig>,
}

/// Task configuration as defined in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task name used on the command line
    pub name: String,

    /// Human-readable title
    pub title: String,

    /// Per-task variables (override shared ones by key)
    #[serde(default)]
    variables: HashMap<String, Value>,

    /// Ordered steps
    pub steps: Vec<StepConfig>,
}

/// Step configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub title: String,

    /// Shell command template, may contain `${name}` placeholders
    pub command: String,
}

/// A marker is either a plain substring or `{ "pattern": ..., "regex": true }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerConfig {
    Simple(String),
    Pattern {
        pattern: String,
        #[serde(default)]
        regex: bool,
    },
}

impl MarkerConfig {
    fn to_pattern(&self) -> ConditionPattern {
        match self {
            MarkerConfig::Simple(s) => ConditionPattern::new(s, false),
            MarkerConfig::Pattern { pattern, regex } => ConditionPattern::new(pattern, *regex),
        }
    }
}

/// Output classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output that fails the current step
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<MarkerConfig>,

    /// Stderr output that is dropped as progress noise
    #[serde(default = "default_noise_markers")]
    pub noise_markers: Vec<MarkerConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            error_markers: default_error_markers(),
            noise_markers: default_noise_markers(),
        }
    }
}

fn default_error_markers() -> Vec<MarkerConfig> {
    vec![MarkerConfig::Simple("[error]".to_string())]
}

fn default_noise_markers() -> Vec<MarkerConfig> {
    vec![
        MarkerConfig::Simple("webpack.Progress".to_string()),
        MarkerConfig::Simple("building".to_string()),
    ]
}

/// Release notes file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Notes file for regular releases, relative to the workspace root
    #[serde(default = "default_notes_file")]
    pub file: String,

    /// Notes file for testing releases
    #[serde(default = "default_testing_file")]
    pub testing_file: String,

    /// Version suffix that marks a testing release
    #[serde(default = "default_testing_suffix")]
    pub testing_suffix: String,

    /// Title line of a freshly created notes file
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            file: default_notes_file(),
            testing_file: default_testing_file(),
            testing_suffix: default_testing_suffix(),
            title: default_title(),
        }
    }
}

impl NotesConfig {
    /// Document used when the notes file is missing or empty
    pub fn default_document(&self) -> String {
        format!("{}\n\n", self.title)
    }
}

fn default_notes_file() -> String {
    "release.md".to_string()
}

fn default_testing_file() -> String {
    "release-testing.md".to_string()
}

fn default_testing_suffix() -> String {
    "-testing".to_string()
}

fn default_title() -> String {
    "# Release Log".to_string()
}

impl ReleaseConfig {
    /// Load configuration from a file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReleaseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ReleaseConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                anyhow::bail!("Task with title '{}' has an empty name", task.title);
            }
            if !seen.insert(&task.name) {
                anyhow::bail!("Duplicate task name: {}", task.name);
            }
            if task.steps.is_empty() {
                anyhow::bail!("Task '{}' has no steps", task.name);
            }
            for (i, step) in task.steps.iter().enumerate() {
                if step.title.trim().is_empty() {
                    anyhow::bail!("Task '{}' step {} has an empty title", task.name, i + 1);
                }
                if step.command.trim().is_empty() {
                    anyhow::bail!("Task '{}' step {} has an empty command", task.name, i + 1);
                }
            }
            for key in task.variables.keys() {
                check_not_reserved(key, Some(&task.name))?;
            }
        }

        for key in self.variables.keys() {
            check_not_reserved(key, None)?;
        }

        for (name, value) in self.variables.iter() {
            scalar_to_string(value).with_context(|| format!("Variable '{}'", name))?;
        }
        for task in &self.tasks {
            for (name, value) in task.variables.iter() {
                scalar_to_string(value)
                    .with_context(|| format!("Task '{}' variable '{}'", task.name, name))?;
            }
        }

        if self.notes.testing_suffix.is_empty() {
            anyhow::bail!("notes.testing_suffix must not be empty");
        }

        Ok(())
    }

    /// Shared variables as strings
    pub fn variables_as_string_map(&self) -> HashMap<String, String> {
        string_map(&self.variables)
    }

    /// Look up a task by name
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Build the runnable definition of a task, shared variables merged in
    pub fn task_definition(&self, name: &str) -> Option<TaskDefinition> {
        self.task(name)
            .map(|task| TaskDefinition::from_config(task, &self.variables_as_string_map()))
    }

    /// Settle delay as a duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS))
    }

    /// Build the output filter from the configured markers
    pub fn output_filter(&self) -> OutputFilter {
        OutputFilter::new(
            self.output.error_markers.iter().map(MarkerConfig::to_pattern).collect(),
            self.output.noise_markers.iter().map(MarkerConfig::to_pattern).collect(),
        )
    }

    /// Placeholders in each step that neither the config nor the reserved set binds
    ///
    /// Returned as `(task name, step title, placeholder)`.
    pub fn unbound_placeholders(&self) -> Vec<(String, String, String)> {
        let mut found = Vec::new();
        for task in &self.tasks {
            let mut vars = self.variables_as_string_map();
            vars.extend(string_map(&task.variables));
            for reserved in RESERVED_VARIABLES {
                vars.insert(reserved.to_string(), String::new());
            }

            for step in &task.steps {
                for name in Template::parse(&step.command).unknown_placeholders(&vars) {
                    found.push((task.name.clone(), step.title.clone(), name));
                }
            }
        }
        found
    }
}

impl TaskConfig {
    /// Per-task variables as strings
    pub fn variables_as_string_map(&self) -> HashMap<String, String> {
        string_map(&self.variables)
    }
}

fn check_not_reserved(key: &str, task: Option<&str>) -> Result<()> {
    if RESERVED_VARIABLES.contains(&key) {
        match task {
            Some(task) => anyhow::bail!("Task '{}' sets reserved variable '{}'", task, key),
            None => anyhow::bail!("Shared variables set reserved variable '{}'", key),
        }
    }
    Ok(())
}

fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => {
            anyhow::bail!("must be a string, number or boolean")
        }
    }
}

fn string_map(values: &HashMap<String, Value>) -> HashMap<String, String> {
    values
        .iter()
        .filter_map(|(k, v)| scalar_to_string(v).ok().map(|s| (k.clone(), s)))
        .collect()
}

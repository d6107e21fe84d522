//! Task and step domain model

use crate::core::{config::TaskConfig, template::Template};
use std::collections::HashMap;

/// A named, ordered list of shell steps plus the variables they may use
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    /// Task name (config key)
    pub name: String,

    /// Human-readable title
    pub title: String,

    /// Shared variables overridden by the task's own
    pub variables: HashMap<String, String>,

    /// Steps in execution order
    pub steps: Vec<StepDefinition>,
}

/// A single step: a title and a command template
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub title: String,

    /// Unresolved command; rendered right before the step runs
    pub command_template: Template,
}

impl TaskDefinition {
    /// Create a task from its config, layering its variables over `shared`
    pub fn from_config(config: &TaskConfig, shared: &HashMap<String, String>) -> Self {
        let mut variables = shared.clone();
        variables.extend(config.variables_as_string_map());

        TaskDefinition {
            name: config.name.clone(),
            title: config.title.clone(),
            variables,
            steps: config
                .steps
                .iter()
                .map(|s| StepDefinition::new(&s.title, &s.command))
                .collect(),
        }
    }

    /// Build a task directly (mostly useful in tests)
    pub fn new(name: &str, title: &str, steps: Vec<StepDefinition>) -> Self {
        TaskDefinition {
            name: name.to_string(),
            title: title.to_string(),
            variables: HashMap::new(),
            steps,
        }
    }

    /// Add or replace a variable
    pub fn with_variable(mut self, key: &str, value: &str) -> Self {
        self.variables.insert(key.to_string(), value.to_string());
        self
    }
}

impl StepDefinition {
    pub fn new(title: &str, command: &str) -> Self {
        StepDefinition {
            title: title.to_string(),
            command_template: Template::parse(command),
        }
    }

    /// Render the command against the given variables
    pub fn resolve(&self, variables: &HashMap<String, String>) -> String {
        self.command_template.render(variables)
    }
}

//! CLI output formatting

use crate::{
    core::{config::TaskConfig, ExecutionStatus, FailureReason, ReleaseConfig},
    execution::RunEvent,
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Idle => style("IDLE").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a failure reason for display
pub fn format_failure(reason: &FailureReason) -> String {
    match reason {
        FailureReason::ExitCode(code) => format!("exited with code {}", style(code).red()),
        FailureReason::ErrorMarker(marker) => {
            format!("error marker {}", style(format!("'{}'", marker)).red())
        }
        FailureReason::Spawn(message) => format!("could not start: {}", style(message).red()),
    }
}

/// Format a run event for display
pub fn format_run_event(event: &RunEvent) -> String {
    match event {
        RunEvent::TaskStarted {
            execution_id,
            task,
            total_steps,
        } => format!(
            "{} Starting task {} ({} steps, {})",
            ROCKET,
            style(task).bold(),
            style(total_steps).cyan(),
            style(&execution_id.to_string()[..8]).dim()
        ),
        RunEvent::StepStarted {
            index,
            title,
            command,
        } => format!(
            "{} [{}] {} {}",
            SPINNER,
            index + 1,
            style(title).cyan(),
            style(format!("$ {}", command)).dim()
        ),
        RunEvent::StepCompleted { index, title } => {
            format!("{} [{}] {}", CHECK, index + 1, style(title).green())
        }
        RunEvent::StepFailed {
            index,
            title,
            reason,
        } => format!(
            "{} [{}] {}: {}",
            CROSS,
            index + 1,
            style(title).red(),
            format_failure(reason)
        ),
        RunEvent::TaskFinished {
            execution_id,
            status,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                other => format_status(*other),
            };
            format!(
                "{} Task ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// One line per task, optionally followed by its steps
pub fn format_task(task: &TaskConfig, with_steps: bool) -> String {
    let mut out = format!(
        "  {} - {} ({} steps)",
        style(&task.name).bold(),
        task.title,
        style(task.steps.len()).cyan()
    );
    if with_steps {
        for (i, step) in task.steps.iter().enumerate() {
            out.push_str(&format!(
                "\n    {}. {} {}",
                i + 1,
                step.title,
                style(format!("$ {}", step.command)).dim()
            ));
        }
    }
    out
}

/// JSON listing of configured tasks
pub fn tasks_json(config: &ReleaseConfig) -> serde_json::Value {
    let tasks: Vec<serde_json::Value> = config
        .tasks
        .iter()
        .map(|task| {
            serde_json::json!({
                "name": task.name,
                "title": task.title,
                "steps": task.steps.iter().map(|s| serde_json::json!({
                    "title": s.title,
                    "command": s.command,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::json!({ "tasks": tasks })
}

/// Machine-readable result of `validate --json`
pub fn validation_json(result: &anyhow::Result<ReleaseConfig>) -> serde_json::Value {
    match result {
        Ok(config) => {
            let unbound: Vec<serde_json::Value> = config
                .unbound_placeholders()
                .into_iter()
                .map(|(task, step, name)| {
                    serde_json::json!({ "task": task, "step": step, "placeholder": name })
                })
                .collect();
            serde_json::json!({
                "valid": true,
                "config": config,
                "unbound_placeholders": unbound,
            })
        }
        Err(e) => serde_json::json!({
            "valid": false,
            "error": format!("{:#}", e),
        }),
    }
}

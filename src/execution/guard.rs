//! In-flight guard - at most one run per task at a time

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Registry of task names that currently have a run in flight
#[derive(Debug, Clone, Default)]
pub struct InFlightRuns {
    running: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of a run; releases the task name on drop
#[derive(Debug)]
pub struct RunGuard {
    task: String,
    running: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `task`, or `None` if a run of it is already in flight
    pub fn try_acquire(&self, task: &str) -> Option<RunGuard> {
        let mut running = self.running.lock().ok()?;
        if !running.insert(task.to_string()) {
            return None;
        }
        Some(RunGuard {
            task: task.to_string(),
            running: self.running.clone(),
        })
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.running
            .lock()
            .map(|running| running.contains(task))
            .unwrap_or(false)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.task);
        }
    }
}

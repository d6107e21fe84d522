//! Output sinks - where run output is written
//!
//! A sink is an append-only text target (a terminal, a buffer) plus two
//! discrete signals: "show the output" and "the process wants to exit".
//! Runs never write to a sink directly; they go through an
//! [`OutputSession`], which owns the sink's lifecycle.

pub mod framing;
pub mod session;

pub use session::{OutputSession, SessionState};

use std::sync::{Arc, Mutex};

/// An append-only text target
pub trait OutputSink: Send + Sync {
    /// Append text
    fn write(&self, text: &str);

    /// Bring the output in front of the user
    fn show(&self) {}

    /// The process has asked to exit; release anything held open
    fn request_exit(&self) {}
}

/// Sink that discards everything
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl OutputSink for NoopSink {
    fn write(&self, _text: &str) {}
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    writes: Arc<Mutex<Vec<String>>>,
    shown: Arc<Mutex<bool>>,
    exit_requested: Arc<Mutex<bool>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// All writes concatenated
    pub fn contents(&self) -> String {
        self.writes().concat()
    }

    pub fn was_shown(&self) -> bool {
        self.shown.lock().map(|s| *s).unwrap_or(false)
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.lock().map(|s| *s).unwrap_or(false)
    }
}

impl OutputSink for BufferSink {
    fn write(&self, text: &str) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(text.to_string());
        }
    }

    fn show(&self) {
        if let Ok(mut shown) = self.shown.lock() {
            *shown = true;
        }
    }

    fn request_exit(&self) {
        if let Ok(mut exit) = self.exit_requested.lock() {
            *exit = true;
        }
    }
}

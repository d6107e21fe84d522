//! Output session - explicit lifecycle around a sink
//!
//! `Open -> Active -> Disposed`. Text written while the session is still
//! `Open` is held back and flushed when it becomes `Active`, so nothing is
//! lost if a run starts writing before the sink is ready. Text written after
//! disposal is dropped.

use crate::output::OutputSink;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Active,
    Disposed,
}

struct Inner {
    state: SessionState,
    pending: Vec<String>,
}

/// Owns a sink for the duration of a run
///
/// Cloning gives another handle to the same session.
#[derive(Clone)]
pub struct OutputSession {
    sink: Arc<dyn OutputSink>,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for OutputSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSession")
            .field("state", &self.state())
            .finish()
    }
}

impl OutputSession {
    /// Open a session over `sink`
    pub fn open(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Open,
                pending: Vec::new(),
            })),
        }
    }

    /// Open and immediately activate
    pub fn active(sink: Arc<dyn OutputSink>) -> Self {
        let session = Self::open(sink);
        session.activate(None);
        session
    }

    pub fn state(&self) -> SessionState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(SessionState::Disposed)
    }

    /// Make the session live: write the greeting, flush held-back text, show the sink
    pub fn activate(&self, greeting: Option<&str>) {
        let pending = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if inner.state != SessionState::Open {
                return;
            }
            inner.state = SessionState::Active;
            std::mem::take(&mut inner.pending)
        };

        if let Some(greeting) = greeting {
            self.sink.write(greeting);
        }
        for text in pending {
            self.sink.write(&text);
        }
        self.sink.show();
    }

    /// Write text to the sink (or hold it until activation)
    pub fn write(&self, text: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        match inner.state {
            SessionState::Open => inner.pending.push(text.to_string()),
            SessionState::Active => {
                drop(inner);
                self.sink.write(text);
            }
            SessionState::Disposed => debug!("Dropping output written after session disposal"),
        }
    }

    /// Write text followed by a newline
    pub fn writeln(&self, text: &str) {
        self.write(&format!("{}\n", text));
    }

    /// Bring the output in front of the user
    pub fn show(&self) {
        if self.state() == SessionState::Active {
            self.sink.show();
        }
    }

    /// Forward an exit request to the sink and dispose the session
    pub fn request_exit(&self) {
        if self.state() != SessionState::Disposed {
            self.sink.request_exit();
        }
        self.dispose();
    }

    /// End the session; later writes are dropped
    pub fn dispose(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.state = SessionState::Disposed;
            inner.pending.clear();
        }
    }
}

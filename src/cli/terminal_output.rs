//! Terminal sink - streams run output to stdout
//!
//! Command output arrives in arbitrary chunks with whatever line endings the
//! child used. The sink frames each chunk to its own line ending and flushes
//! immediately so long-running commands show progress as it happens.
//!
//! # Example
//!
//! ```no_run
//! use release_runner::cli::terminal_output::TerminalSink;
//! use release_runner::output::OutputSink;
//!
//! let sink = TerminalSink::for_stdout();
//! sink.write("building...\n");
//! ```

use crate::output::{framing::frame_lines, OutputSink};
use console::{style, Term};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Sink that prints to stdout
#[derive(Debug)]
pub struct TerminalSink {
    line_ending: &'static str,
    shown: AtomicBool,
}

impl TerminalSink {
    /// Create a sink that frames output with `line_ending`
    pub fn new(line_ending: &'static str) -> Self {
        Self {
            line_ending,
            shown: AtomicBool::new(false),
        }
    }

    /// `\r\n` framing on an interactive terminal, plain `\n` when piped
    pub fn for_stdout() -> Self {
        if Term::stdout().is_term() {
            Self::new("\r\n")
        } else {
            Self::new("\n")
        }
    }

    pub fn line_ending(&self) -> &'static str {
        self.line_ending
    }

    /// Print a separator line
    ///
    /// A horizontal rule spanning the terminal width.
    fn print_separator(&self) {
        // Get terminal width, default to 80 if unavailable
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        print!("{}{}", style("─".repeat(width)).dim(), self.line_ending);
        self.flush_stdout();
    }

    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}

impl OutputSink for TerminalSink {
    fn write(&self, text: &str) {
        print!("{}", frame_lines(text, self.line_ending));
        self.flush_stdout();
    }

    fn show(&self) {
        if !self.shown.swap(true, Ordering::SeqCst) {
            self.print_separator();
        }
    }

    fn request_exit(&self) {
        if self.shown.load(Ordering::SeqCst) {
            self.print_separator();
        }
    }
}

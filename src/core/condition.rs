//! Output classification - error markers and build-progress noise

use regex::Regex;
use tracing::warn;

/// Which output stream a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Pattern for matching command output (not serializable due to Regex)
#[derive(Debug, Clone)]
pub enum ConditionPattern {
    /// Simple string contains match
    Simple(String),
    /// Regular expression match
    Regex(Regex),
}

impl ConditionPattern {
    /// Build a pattern, falling back to a plain substring if the regex is invalid
    pub fn new(pattern: &str, use_regex: bool) -> Self {
        if !use_regex {
            return ConditionPattern::Simple(pattern.to_string());
        }
        match Regex::new(pattern) {
            Ok(regex) => ConditionPattern::Regex(regex),
            Err(e) => {
                warn!("Invalid marker regex '{}', matching literally: {}", pattern, e);
                ConditionPattern::Simple(pattern.to_string())
            }
        }
    }

    /// Check if the pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ConditionPattern::Simple(pattern) => text.contains(pattern.as_str()),
            ConditionPattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// Get display string for the pattern
    pub fn display(&self) -> &str {
        match self {
            ConditionPattern::Simple(s) => s,
            ConditionPattern::Regex(r) => r.as_str(),
        }
    }
}

/// What to do with a chunk of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkClass {
    /// Pass to the output sink
    Forward,
    /// Known progress noise, drop it
    Suppress,
    /// Contains an error marker; the step has failed
    ErrorMarker(String),
}

/// Classifies streamed output chunks
#[derive(Debug, Clone)]
pub struct OutputFilter {
    error_markers: Vec<ConditionPattern>,
    noise_markers: Vec<ConditionPattern>,
}

impl OutputFilter {
    pub fn new(error_markers: Vec<ConditionPattern>, noise_markers: Vec<ConditionPattern>) -> Self {
        Self {
            error_markers,
            noise_markers,
        }
    }

    /// Error markers win over noise; noise is only recognised on stderr.
    pub fn classify(&self, stream: StreamKind, chunk: &str) -> ChunkClass {
        if let Some(marker) = self.error_marker(chunk) {
            return ChunkClass::ErrorMarker(marker.display().to_string());
        }
        self.classify_noise(stream, chunk)
    }

    /// Stateful classifier for one command's output
    pub fn scanner(&self) -> OutputScanner<'_> {
        OutputScanner {
            filter: self,
            carry: self.carry_len(),
            stdout_tail: String::new(),
            stderr_tail: String::new(),
        }
    }

    fn error_marker(&self, text: &str) -> Option<&ConditionPattern> {
        self.error_markers.iter().find(|m| m.matches(text))
    }

    fn classify_noise(&self, stream: StreamKind, chunk: &str) -> ChunkClass {
        if stream == StreamKind::Stderr && self.noise_markers.iter().any(|m| m.matches(chunk)) {
            return ChunkClass::Suppress;
        }
        ChunkClass::Forward
    }

    /// Bytes of earlier output a marker split across reads could start in
    fn carry_len(&self) -> usize {
        self.error_markers
            .iter()
            .map(|m| match m {
                ConditionPattern::Simple(s) => s.len().saturating_sub(1),
                ConditionPattern::Regex(_) => REGEX_CARRY,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Earlier output kept per stream when a regex marker has no fixed length
const REGEX_CARRY: usize = 256;

/// Classifies a command's chunks in order, so an error marker split across
/// two reads (`[err` then `or]`) is still found
#[derive(Debug)]
pub struct OutputScanner<'a> {
    filter: &'a OutputFilter,
    carry: usize,
    stdout_tail: String,
    stderr_tail: String,
}

impl OutputScanner<'_> {
    pub fn classify(&mut self, stream: StreamKind, chunk: &str) -> ChunkClass {
        let tail = match stream {
            StreamKind::Stdout => &mut self.stdout_tail,
            StreamKind::Stderr => &mut self.stderr_tail,
        };

        let mut window = std::mem::take(tail);
        window.push_str(chunk);
        if let Some(marker) = self.filter.error_marker(&window) {
            return ChunkClass::ErrorMarker(marker.display().to_string());
        }
        *tail = suffix(&window, self.carry).to_string();

        self.filter.classify_noise(stream, chunk)
    }
}

/// At most `max` trailing bytes of `text`, cut on a char boundary
fn suffix(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self::new(
            vec![ConditionPattern::Simple("[error]".to_string())],
            vec![
                ConditionPattern::Simple("webpack.Progress".to_string()),
                ConditionPattern::Simple("building".to_string()),
            ],
        )
    }
}

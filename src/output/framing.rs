//! Line-oriented output framing
//!
//! Child processes emit `\n` or `\r\n` line endings; a raw terminal needs
//! `\r\n` to return to column zero. Framing splits text on line boundaries
//! and rejoins it with the target's line ending.

/// Rejoin `text` with `line_ending` between lines
///
/// A trailing line break is kept as a trailing line ending. Bare `\r`
/// (carriage-return progress updates) is left alone.
pub fn frame_lines(text: &str, line_ending: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        let is_last = lines.peek().is_none();
        if is_last {
            out.push_str(line);
        } else {
            out.push_str(line.strip_suffix('\r').unwrap_or(line));
            out.push_str(line_ending);
        }
    }

    out
}

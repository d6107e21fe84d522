//! Release document model - Markdown as an ordered list of line blocks

use serde::{Deserialize, Serialize};

/// Kind of a block-level node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// ATX heading (`#`, `##`, ...) with its level
    Heading(u8),
    /// Ordered (`1.`) or bullet (`-`, `*`, `+`) list item
    ListItem,
    /// Any other non-blank line
    Text,
}

impl BlockKind {
    fn classify(line: &str) -> Self {
        let trimmed = line.trim_start();

        let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
        if (1..=6).contains(&hashes) {
            let rest = &trimmed[hashes..];
            if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
                return BlockKind::Heading(hashes as u8);
            }
        }

        if ["- ", "* ", "+ "].iter().any(|p| trimmed.starts_with(p)) {
            return BlockKind::ListItem;
        }

        let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && trimmed[digits..].starts_with(". ") {
            return BlockKind::ListItem;
        }

        BlockKind::Text
    }
}

/// A single non-blank line of the document plus the blank lines that follow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,

    /// The line exactly as it appeared (without line ending)
    pub text: String,

    /// Blank (or whitespace-only) lines after this block, kept verbatim
    pub trailing: Vec<String>,
}

impl Block {
    /// Create a block from a line of Markdown, followed by `blank_lines` empty lines
    pub fn new(text: impl Into<String>, blank_lines: usize) -> Self {
        let text = text.into();
        Self {
            kind: BlockKind::classify(&text),
            text,
            trailing: vec![String::new(); blank_lines],
        }
    }

    pub fn is_heading(&self, level: u8) -> bool {
        self.kind == BlockKind::Heading(level)
    }
}

/// Line ending used when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// A release-notes document
///
/// Parsing and rendering round-trip byte for byte; the only way to change
/// the output is to insert blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDocument {
    /// Blank lines before the first block
    leading: Vec<String>,
    blocks: Vec<Block>,
    line_ending: LineEnding,
    final_newline: bool,
}

impl ReleaseDocument {
    /// Parse Markdown text into blocks
    pub fn parse(source: &str) -> Self {
        let line_ending = if source.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        let final_newline = source.ends_with('\n');
        let body = source.strip_suffix('\n').unwrap_or(source);
        let body = if line_ending == LineEnding::CrLf {
            body.strip_suffix('\r').unwrap_or(body)
        } else {
            body
        };

        let mut leading = Vec::new();
        let mut blocks: Vec<Block> = Vec::new();

        if !source.is_empty() {
            for raw in body.split('\n') {
                let line = if line_ending == LineEnding::CrLf {
                    raw.strip_suffix('\r').unwrap_or(raw)
                } else {
                    raw
                };

                if line.trim().is_empty() {
                    match blocks.last_mut() {
                        Some(block) => block.trailing.push(line.to_string()),
                        None => leading.push(line.to_string()),
                    }
                } else {
                    blocks.push(Block {
                        kind: BlockKind::classify(line),
                        text: line.to_string(),
                        trailing: Vec::new(),
                    });
                }
            }
        }

        Self {
            leading,
            blocks,
            line_ending,
            final_newline,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The first block, which holds the document title
    pub fn title(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Insert blocks at `index`, shifting everything at or after it down
    pub fn insert_blocks(&mut self, index: usize, new_blocks: Vec<Block>) {
        let index = index.min(self.blocks.len());
        self.blocks.splice(index..index, new_blocks);
    }

    /// Render the document back to Markdown
    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        lines.extend(self.leading.iter().map(String::as_str));
        for block in &self.blocks {
            lines.push(&block.text);
            lines.extend(block.trailing.iter().map(String::as_str));
        }

        let eol = self.line_ending.as_str();
        let mut out = lines.join(eol);
        if self.final_newline {
            out.push_str(eol);
        }
        out
    }
}

//! Command templates with `${name}` placeholders
//!
//! Substitution is purely textual: a placeholder is replaced with the value
//! bound to its name and the result is never scanned again, so a value that
//! itself contains `${...}` is inserted as-is. Placeholders with no binding
//! are left in the output untouched, which lets shell variables such as
//! `${HOME}` pass through to the shell.

use std::collections::HashMap;
use thiserror::Error;

/// Errors from strict template rendering
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder(s): {}", .0.join(", "))]
    UnknownPlaceholders(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, raw: String },
}

/// A parsed command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };

            let name = &after[..end];
            literal.push_str(&rest[..start]);

            if is_valid_name(name) {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder {
                    name: name.to_string(),
                    raw: format!("${{{}}}", name),
                });
            } else {
                literal.push_str(&rest[start..start + 2 + end + 1]);
            }

            rest = &after[end + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// The original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance (duplicates kept)
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Placeholder names that have no binding in `variables`, deduplicated
    pub fn unknown_placeholders(&self, variables: &HashMap<String, String>) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for name in self.placeholders() {
            if !variables.contains_key(name) && !unknown.iter().any(|u| u == name) {
                unknown.push(name.to_string());
            }
        }
        unknown
    }

    /// Substitute bound placeholders, leaving unbound ones verbatim
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, raw } => match variables.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(raw),
                },
            }
        }
        out
    }

    /// Substitute placeholders, failing if any is unbound
    pub fn render_strict(&self, variables: &HashMap<String, String>) -> Result<String, TemplateError> {
        let unknown = self.unknown_placeholders(variables);
        if !unknown.is_empty() {
            return Err(TemplateError::UnknownPlaceholders(unknown));
        }
        Ok(self.render(variables))
    }
}

/// Names are identifiers, optionally dotted: `root`, `dist_dir`, `dist.prod`
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

/// Parse and render in one go
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    Template::parse(template).render(variables)
}

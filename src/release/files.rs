//! Workspace files: the release notes file and package.json

use crate::core::config::NotesConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Notes file for `version`: the testing file when the version ends with the testing suffix
pub fn notes_file_for(root: &Path, notes: &NotesConfig, version: &str) -> PathBuf {
    let is_testing = !notes.testing_suffix.is_empty() && version.ends_with(&notes.testing_suffix);
    if is_testing {
        root.join(&notes.testing_file)
    } else {
        root.join(&notes.file)
    }
}

/// Read the notes file, treating a missing file as empty
pub fn read_notes(path: &Path) -> std::io::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No notes file at {}, starting fresh", path.display());
            Ok(String::new())
        }
        Err(e) => Err(e),
    }
}

/// Atomically write `data` to `path` using a tempfile in the same directory
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// `version` field of `package.json` in `root`, if there is one
pub fn package_version(root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(root.join("package.json")).ok()?;
    let json: serde_json::Value = serde_json::from_str(&content).ok()?;
    json.get("version")?.as_str().map(str::to_string)
}

/// Split free text into record lines, normalising CRLF
pub fn split_records(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}

//! Changed-file types produced by the change tracker.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a file differs from the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// New file, staged or untracked.
    Added,
    /// Tracked file with working-tree or index modifications.
    Modified,
    /// Renamed file, possibly with content changes.
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Renamed => write!(f, "renamed"),
        }
    }
}

/// One changed file, captured for a single review cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path relative to the workspace root, `/`-separated.
    pub path: String,
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Content as of the last commit, when it could be fetched.
    pub prior_content: Option<String>,
    pub current_content: String,
    /// Unified diff against the last commit. Empty for added files; for
    /// modified files it falls back to the full current content.
    pub diff_text: String,
    pub kind: ChangeKind,
}

impl FileChange {
    /// File extension without the dot, or an empty string.
    pub fn extension(&self) -> &str {
        std::path::Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    /// Number of lines in the current content.
    pub fn line_count(&self) -> usize {
        self.current_content.lines().count()
    }
}

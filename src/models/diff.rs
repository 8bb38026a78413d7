//! Unified diff hunks, as read back from `git diff`.

/// Which side of the diff a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineType {
    Added,
    Removed,
    Context,
}

/// One body line of a hunk, without its `+`/`-`/space marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub content: String,
    /// 1-based position in the committed file; `None` for additions.
    pub old_line_no: Option<u32>,
    /// 1-based position in the working copy; `None` for removals.
    pub new_line_no: Option<u32>,
}

impl DiffLine {
    /// Whether the line is an addition or a removal.
    pub fn is_change(&self) -> bool {
        self.line_type != DiffLineType::Context
    }
}

/// An `@@` section and its body.
#[derive(Debug, Clone)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Trailing text after the second `@@`, usually the enclosing function.
    pub header: Option<String>,
    pub lines: Vec<DiffLine>,
}

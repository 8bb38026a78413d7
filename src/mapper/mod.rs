//! Resolution of findings to exact text ranges.
//!
//! A finding names a line and the code the model expects there. The
//! mapper checks the line still exists in the current document and picks
//! the columns to underline: the snippet itself when it is found verbatim,
//! otherwise a span anchored at the snippet's first token, otherwise the
//! whole line. Columns count Unicode scalar values.

use std::collections::HashMap;

use crate::models::{DiagnosticSet, PositionedAnnotation, Range, ReviewFinding};

/// Immutable view of a document's text at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    lines: Vec<String>,
}

impl DocumentSnapshot {
    /// Split `text` into lines. `\r\n` endings are normalized, and a
    /// trailing newline yields a final empty line, as editors count it.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        Self { lines }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 0-based line access.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }
}

/// Place `finding` in `doc`, or `None` when its line is out of range.
pub fn resolve(finding: &ReviewFinding, doc: &DocumentSnapshot) -> Option<PositionedAnnotation> {
    let line_no = finding.line as usize;
    if line_no == 0 || line_no > doc.line_count() {
        tracing::debug!(
            file = %finding.file_path,
            line = line_no,
            line_count = doc.line_count(),
            "dropping finding outside document"
        );
        return None;
    }

    let index = line_no - 1;
    let text = doc.line(index)?;
    let (start, end) = locate(text, &finding.snippet);

    Some(PositionedAnnotation {
        finding: finding.clone(),
        range: Range::on_line(index, start, end),
    })
}

/// Resolve a batch against per-file snapshots keyed by normalized path.
///
/// Findings for files without a snapshot are dropped.
pub fn resolve_all(
    findings: &[ReviewFinding],
    documents: &HashMap<String, DocumentSnapshot>,
) -> DiagnosticSet {
    let mut set = DiagnosticSet::new();
    for finding in findings {
        let path = finding.normalized_path();
        let Some(doc) = documents.get(path) else {
            tracing::debug!(file = %path, "dropping finding for unknown document");
            continue;
        };
        if let Some(annotation) = resolve(finding, doc) {
            set.push(path, annotation);
        }
    }
    set
}

/// Column span `[start, end)` for `snippet` within `line`.
fn locate(line: &str, snippet: &str) -> (usize, usize) {
    let line_len = line.chars().count();
    if snippet.trim().is_empty() {
        return (0, line_len);
    }

    if let Some(byte) = line.find(snippet) {
        let start = line[..byte].chars().count();
        return (start, start + snippet.chars().count());
    }

    if let Some(byte) = snippet
        .split_whitespace()
        .next()
        .and_then(|token| line.find(token))
    {
        let start = line[..byte].chars().count();
        // The full snippet length can run past the line end.
        let end = (start + snippet.chars().count()).min(line_len);
        return (start, end);
    }

    (0, line_len)
}

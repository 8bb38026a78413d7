//! Positioned annotations and the per-file diagnostic set.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::finding::{ReviewFinding, Severity};

/// A 0-based line/character position. Characters are Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

/// A half-open `[start, end)` text range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// A range within a single line.
    pub fn on_line(line: usize, start: usize, end: usize) -> Self {
        Self {
            start: Position {
                line,
                character: start,
            },
            end: Position {
                line,
                character: end,
            },
        }
    }
}

/// A finding resolved to an exact range in a document snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedAnnotation {
    pub finding: ReviewFinding,
    pub range: Range,
}

impl PositionedAnnotation {
    pub fn severity(&self) -> Severity {
        self.finding.severity
    }
}

/// Annotations grouped per file, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticSet {
    files: IndexMap<String, Vec<PositionedAnnotation>>,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation under `file`.
    pub fn push(&mut self, file: impl Into<String>, annotation: PositionedAnnotation) {
        self.files.entry(file.into()).or_default().push(annotation);
    }

    /// Set the annotations of `file`, dropping the file when `annotations`
    /// is empty.
    pub fn replace_file(&mut self, file: impl Into<String>, annotations: Vec<PositionedAnnotation>) {
        let file = file.into();
        if annotations.is_empty() {
            self.files.shift_remove(&file);
        } else {
            self.files.insert(file, annotations);
        }
    }

    /// Annotations for one file, if any.
    pub fn get(&self, file: &str) -> Option<&[PositionedAnnotation]> {
        self.files.get(file).map(Vec::as_slice)
    }

    /// Iterate `(file, annotations)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PositionedAnnotation])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate every annotation across all files.
    pub fn annotations(&self) -> impl Iterator<Item = &PositionedAnnotation> {
        self.files.values().flatten()
    }

    /// Number of files with at least one annotation.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of annotations.
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(file: &str, line: u32) -> PositionedAnnotation {
        PositionedAnnotation {
            finding: ReviewFinding {
                file_path: file.into(),
                line,
                snippet: String::new(),
                message: "m".into(),
                severity: Severity::Warning,
                suggestions: vec![],
                praise: None,
            },
            range: Range::on_line(line as usize - 1, 0, 4),
        }
    }

    #[test]
    fn push_groups_by_file_in_order() {
        let mut set = DiagnosticSet::new();
        set.push("b.ts", annotation("b.ts", 3));
        set.push("a.ts", annotation("a.ts", 1));
        set.push("b.ts", annotation("b.ts", 7));

        let files: Vec<_> = set.iter().map(|(f, _)| f).collect();
        assert_eq!(files, vec!["b.ts", "a.ts"]);
        assert_eq!(set.get("b.ts").unwrap().len(), 2);
        assert_eq!(set.len(), 3);
        assert_eq!(set.file_count(), 2);
        assert!(set.get("c.ts").is_none());
    }

    #[test]
    fn replace_file_keeps_position_and_drops_empty() {
        let mut set = DiagnosticSet::new();
        set.push("a.ts", annotation("a.ts", 1));
        set.push("b.ts", annotation("b.ts", 2));

        set.replace_file("a.ts", vec![annotation("a.ts", 9)]);
        assert_eq!(set.iter().map(|(f, _)| f).collect::<Vec<_>>(), vec!["a.ts", "b.ts"]);
        assert_eq!(set.get("a.ts").unwrap()[0].finding.line, 9);

        set.replace_file("a.ts", vec![]);
        assert_eq!(set.file_count(), 1);
        assert!(set.get("a.ts").is_none());
    }
}

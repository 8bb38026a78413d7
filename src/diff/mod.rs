//! Diff reading: unified hunk parsing and the reduced added/removed view
//! used by the prompt builder.

pub mod parser;

use crate::models::diff::{DiffLine, DiffLineType};

pub use parser::parse_hunks;

/// Extract only the added and removed lines from a diff body.
///
/// Real unified diffs go through the hunk parser. Text that has no hunks
/// (the full-content fallback used when `git diff` fails) is scanned line
/// by line for raw `+`/`-` markers instead, skipping `+++`/`---` file
/// headers.
pub fn changed_lines(diff_text: &str) -> Vec<DiffLine> {
    let hunks = parse_hunks(diff_text);
    if !hunks.is_empty() {
        return hunks
            .into_iter()
            .flat_map(|h| h.lines)
            .filter(DiffLine::is_change)
            .collect();
    }

    diff_text
        .lines()
        .filter(|line| !line.starts_with("+++") && !line.starts_with("---"))
        .filter_map(|line| {
            let (line_type, content) = if let Some(rest) = line.strip_prefix('+') {
                (DiffLineType::Added, rest)
            } else if let Some(rest) = line.strip_prefix('-') {
                (DiffLineType::Removed, rest)
            } else {
                return None;
            };
            Some(DiffLine {
                line_type,
                content: content.to_string(),
                old_line_no: None,
                new_line_no: None,
            })
        })
        .collect()
}

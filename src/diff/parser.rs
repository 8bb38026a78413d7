//! Unified diff hunk parser.
//!
//! Parses the hunks of a single-file `git diff` into [`Hunk`]s. File
//! headers (`diff --git`, `index`, `---`/`+++`) are skipped; only `@@`
//! sections and their bodies are kept.

use crate::models::diff::{DiffLine, DiffLineType, Hunk};

/// Parse every hunk in a unified diff.
pub fn parse_hunks(input: &str) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(&next) = lines.peek() {
        if next.starts_with("@@") {
            match parse_hunk(&mut lines) {
                Some(hunk) => hunks.push(hunk),
                None => {
                    // Malformed header; skip it and keep looking.
                    lines.next();
                }
            }
        } else {
            lines.next();
        }
    }

    hunks
}

/// Parse a single hunk starting with an `@@` line.
fn parse_hunk(lines: &mut std::iter::Peekable<std::str::Lines<'_>>) -> Option<Hunk> {
    let header_line = lines.peek()?;
    let (old_start, old_count, new_start, new_count, header) = parse_hunk_header(header_line)?;
    lines.next();

    let mut hunk_lines: Vec<DiffLine> = Vec::new();
    let mut old_line = old_start;
    let mut new_line = new_start;

    while let Some(&line) = lines.peek() {
        if line.starts_with("diff --git ") || line.starts_with("@@") {
            break;
        }

        if let Some(content) = line.strip_prefix('+') {
            hunk_lines.push(DiffLine {
                line_type: DiffLineType::Added,
                content: content.to_string(),
                old_line_no: None,
                new_line_no: Some(new_line),
            });
            new_line += 1;
        } else if let Some(content) = line.strip_prefix('-') {
            hunk_lines.push(DiffLine {
                line_type: DiffLineType::Removed,
                content: content.to_string(),
                old_line_no: Some(old_line),
                new_line_no: None,
            });
            old_line += 1;
        } else if line.starts_with(' ') || line.is_empty() {
            hunk_lines.push(DiffLine {
                line_type: DiffLineType::Context,
                content: line.get(1..).unwrap_or_default().to_string(),
                old_line_no: Some(old_line),
                new_line_no: Some(new_line),
            });
            old_line += 1;
            new_line += 1;
        } else if !line.starts_with('\\') {
            // Unknown line format, stop parsing this hunk
            break;
        }
        // "\ No newline at end of file" falls through and is skipped.
        lines.next();
    }

    Some(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        header,
        lines: hunk_lines,
    })
}

/// Parse a `@@ -old_start,old_count +new_start,new_count @@ header` line.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32, Option<String>)> {
    let line = line.strip_prefix("@@ ")?;
    let end = line.find(" @@")?;
    let range_part = &line[..end];
    let rest = line[end + 3..].trim();
    let header = (!rest.is_empty()).then(|| rest.to_string());

    let (old, new) = range_part.split_once(' ')?;
    let (old_start, old_count) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(new.strip_prefix('+')?)?;

    Some((old_start, old_count, new_start, new_count, header))
}

/// Parse "start,count" or "start" (count defaults to 1).
fn parse_range(s: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}

//! Prompt construction: one instruction payload for a batch of changed files.

use crate::diff::changed_lines;
use crate::models::FileChange;
use crate::models::diff::DiffLineType;

/// Default cap on the number of findings the model is asked to report.
pub const DEFAULT_MAX_FINDINGS: usize = 10;

/// Knobs that shape the instruction preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    pub max_findings: usize,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            max_findings: DEFAULT_MAX_FINDINGS,
        }
    }
}

/// Build the full prompt for `files`.
pub fn build_prompt(files: &[FileChange], options: &PromptOptions) -> String {
    let mut prompt = preamble(options);

    for file in files {
        push_file_section(&mut prompt, file);
    }

    prompt
}

fn preamble(options: &PromptOptions) -> String {
    format!(
        "You are a senior software engineer reviewing a colleague's uncommitted changes. \
        Point out bugs, security problems, performance traps and maintainability risks \
        in the files below.\n\n\
        ## Severity\n\n\
        - \"error\": a defect that will cause incorrect behaviour, data loss or a security hole\n\
        - \"warning\": a likely problem or risky pattern that should be addressed\n\
        - \"info\": a minor improvement worth considering\n\n\
        ## Output format\n\n\
        Emit one JSON object per finding with exactly these fields:\n\n\
        {{\"filePath\": \"<path as given in the File header>\", \"line\": <1-based line number>, \
        \"code\": \"<the offending code, copied verbatim from that line>\", \
        \"message\": \"<what is wrong and why>\", \"severity\": \"error\" | \"warning\" | \"info\", \
        \"suggestions\": [{{\"description\": \"<what the fix does>\", \"code\": \"<replacement code>\"}}], \
        \"praise\": \"<optional: something done well>\"}}\n\n\
        ## Rules\n\n\
        - Output one JSON object per finding, one after another. Do not wrap them in an array \
        and do not add any prose, headings or code fences.\n\
        - Report at most the {max} most serious issues.\n\
        - Ignore purely stylistic nits such as formatting, naming taste or import order.\n\
        - Never fabricate a documentation URL. Only mention a link if you are certain it exists.\n\
        - Line numbers refer to the numbered listing of each file below.\n\
        - If there is nothing worth reporting, output nothing.\n\n",
        max = options.max_findings,
    )
}

fn push_file_section(prompt: &mut String, file: &FileChange) {
    prompt.push_str(&format!("File: {} ({})\n", file.path, file.kind));

    let extension = file.extension();
    if !extension.is_empty() {
        prompt.push_str(&format!("Extension: {extension}\n"));
    }
    prompt.push_str(&format!("Lines: {}\n\n", file.line_count()));

    prompt.push_str("Content:\n");
    for (i, line) in file.current_content.lines().enumerate() {
        prompt.push_str(&format!("{}: {line}\n", i + 1));
    }
    prompt.push('\n');

    if file.diff_text.is_empty() {
        return;
    }
    let changes = changed_lines(&file.diff_text);
    if changes.is_empty() {
        return;
    }

    prompt.push_str("Changes:\n");
    for line in changes {
        let tag = match line.line_type {
            DiffLineType::Added => "Added",
            DiffLineType::Removed => "Removed",
            DiffLineType::Context => continue,
        };
        prompt.push_str(&format!("{tag}: {}\n", line.content));
    }
    prompt.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeKind;
    use std::path::PathBuf;

    fn change(path: &str, content: &str, diff: &str, kind: ChangeKind) -> FileChange {
        FileChange {
            path: path.into(),
            absolute_path: PathBuf::from("/repo").join(path),
            prior_content: None,
            current_content: content.into(),
            diff_text: diff.into(),
            kind,
        }
    }

    #[test]
    fn preamble_carries_constraints() {
        let prompt = build_prompt(&[], &PromptOptions { max_findings: 7 });
        assert!(prompt.contains("at most the 7 most serious"));
        assert!(prompt.contains("stylistic nits"));
        assert!(prompt.contains("Never fabricate a documentation URL"));
        assert!(prompt.contains("\"filePath\""));
        assert!(prompt.contains("Do not wrap them in an array"));
    }

    #[test]
    fn file_section_numbers_lines_and_lists_changes() {
        let file = change(
            "src/app.ts",
            "const a = 1;\nconst b = 2;\n",
            "@@ -1,2 +1,2 @@\n const a = 1;\n-const b = 3;\n+const b = 2;\n",
            ChangeKind::Modified,
        );
        let prompt = build_prompt(&[file], &PromptOptions::default());

        assert!(prompt.contains("File: src/app.ts (modified)"));
        assert!(prompt.contains("Extension: ts"));
        assert!(prompt.contains("Lines: 2"));
        assert!(prompt.contains("1: const a = 1;\n2: const b = 2;\n"));
        assert!(prompt.contains("Removed: const b = 3;\nAdded: const b = 2;\n"));
        assert!(!prompt.contains("Added: const a = 1;"));
    }

    #[test]
    fn added_file_has_no_changes_section() {
        let file = change("notes.md", "hello\n", "", ChangeKind::Added);
        let prompt = build_prompt(&[file], &PromptOptions::default());
        assert!(prompt.contains("File: notes.md (added)"));
        assert!(!prompt.contains("Changes:"));
    }

    #[test]
    fn full_content_fallback_uses_raw_markers() {
        let file = change(
            "list.txt",
            "+plus item\nplain\n",
            "+plus item\nplain\n",
            ChangeKind::Modified,
        );
        let prompt = build_prompt(&[file], &PromptOptions::default());
        assert!(prompt.contains("Changes:\nAdded: plus item\n"));
    }

    #[test]
    fn multiple_files_in_order() {
        let a = change("a.rs", "a\n", "", ChangeKind::Added);
        let b = change("b.rs", "b\n", "", ChangeKind::Added);
        let prompt = build_prompt(&[a, b], &PromptOptions::default());
        let ia = prompt.find("File: a.rs").unwrap();
        let ib = prompt.find("File: b.rs").unwrap();
        assert!(ia < ib);
    }

    #[test]
    fn build_prompt_is_deterministic() {
        let file = change("a.rs", "fn x() {}\n", "", ChangeKind::Added);
        let opts = PromptOptions::default();
        assert_eq!(
            build_prompt(std::slice::from_ref(&file), &opts),
            build_prompt(std::slice::from_ref(&file), &opts)
        );
    }
}

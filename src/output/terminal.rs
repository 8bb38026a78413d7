//! Terminal renderer: styled flowing text grouped by file.

use colored::Colorize;

use crate::models::finding::{Severity, Summary};
use crate::models::{DiagnosticSet, PositionedAnnotation};
use crate::output::OutputRenderer;

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Render the annotations of a single file, without the summary.
    pub fn render_file(&self, file: &str, annotations: &[PositionedAnnotation]) -> String {
        let mut sorted = annotations.to_vec();
        sorted.sort_by_key(|a| (a.range.start.line, a.range.start.character));

        let mut output = String::new();
        for annotation in &sorted {
            let finding = &annotation.finding;
            let (icon, severity_str) = match finding.severity {
                Severity::Error => (
                    "✖".red().bold().to_string(),
                    "error".red().bold().to_string(),
                ),
                Severity::Warning => (
                    "⚠".yellow().bold().to_string(),
                    "warning".yellow().bold().to_string(),
                ),
                Severity::Info => (
                    "ℹ".blue().bold().to_string(),
                    "info".blue().bold().to_string(),
                ),
            };

            // Ranges are 0-based; people read 1-based.
            let location = format!(
                "{}:{}:{}",
                file,
                annotation.range.start.line + 1,
                annotation.range.start.character + 1
            );

            output.push_str(&format!(" {} {} in {}\n", icon, severity_str, location.bold()));
            output.push_str(&format!("   {}\n", finding.message));

            for suggestion in &finding.suggestions {
                output.push_str(&format!("   {} {}\n", "→".cyan(), suggestion.description));
                for line in suggestion.replacement_code.lines() {
                    output.push_str(&format!("     {}\n", line.dimmed()));
                }
            }

            if let Some(ref praise) = finding.praise {
                output.push_str(&format!("   {} {}\n", "✔".green(), praise));
            }

            output.push('\n');
        }
        output
    }
}

impl OutputRenderer for TerminalRenderer {
    fn render(&self, set: &DiagnosticSet) -> String {
        if set.is_empty() {
            return format!("{}", "  ✔ No issues found.\n".green());
        }

        let mut output = String::new();
        for (file, annotations) in set.iter() {
            output.push_str(&self.render_file(file, annotations));
        }

        let summary = Summary::from_severities(set.annotations().map(|a| a.severity()));
        output.push_str(&format!("{}\n", "───────────────────────────────────".dimmed()));
        output.push_str(&format!(
            " {} findings in {} {}: {} {}, {} {}, {} {}\n",
            summary.total.to_string().bold(),
            set.file_count(),
            if set.file_count() == 1 { "file" } else { "files" },
            summary.errors.to_string().red().bold(),
            if summary.errors == 1 { "error" } else { "errors" },
            summary.warnings.to_string().yellow().bold(),
            if summary.warnings == 1 { "warning" } else { "warnings" },
            summary.info.to_string().blue().bold(),
            if summary.info == 1 { "info" } else { "infos" },
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Range, ReviewFinding, Suggestion};

    fn annotation(line: u32, col: usize, severity: Severity, message: &str) -> PositionedAnnotation {
        PositionedAnnotation {
            finding: ReviewFinding {
                file_path: "src/main.rs".into(),
                line,
                snippet: String::new(),
                message: message.into(),
                severity,
                suggestions: vec![],
                praise: None,
            },
            range: Range::on_line(line as usize - 1, col, col + 3),
        }
    }

    #[test]
    fn render_empty() {
        let output = TerminalRenderer.render(&DiagnosticSet::new());
        assert!(output.contains("No issues found"));
    }

    #[test]
    fn render_findings() {
        let mut with_fix = annotation(42, 4, Severity::Error, "This is broken");
        with_fix.finding.suggestions.push(Suggestion {
            description: "Fix it".into(),
            replacement_code: "let y = 2;".into(),
        });
        with_fix.finding.praise = Some("Clear naming".into());

        let mut set = DiagnosticSet::new();
        set.push("src/main.rs", annotation(67, 0, Severity::Warning, "Could be faster"));
        set.push("src/main.rs", with_fix);

        let output = TerminalRenderer.render(&set);
        // Content may be wrapped in ANSI color codes.
        assert!(output.contains("src/main.rs:42:5"));
        assert!(output.contains("This is broken"));
        assert!(output.contains("Fix it"));
        assert!(output.contains("let y = 2;"));
        assert!(output.contains("Clear naming"));
        assert!(output.contains("findings"));
        let first = output.find("src/main.rs:42").unwrap();
        let second = output.find("src/main.rs:67").unwrap();
        assert!(first < second, "annotations should be ordered by line");
    }
}

//! JSON output renderer.
//!
//! Outputs `{"files": {...}, "summary": {...}}`, with annotations grouped
//! under their workspace-relative path.

use crate::models::DiagnosticSet;
use crate::models::finding::Summary;
use crate::output::OutputRenderer;

pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, set: &DiagnosticSet) -> String {
        let summary = Summary::from_severities(set.annotations().map(|a| a.severity()));

        let output = serde_json::json!({
            "files": set,
            "summary": summary,
        });

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}

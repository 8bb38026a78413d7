//! Output: renderers for a diagnostic set, and the terminal editor host.

pub mod console;
pub mod json;
pub mod terminal;

use crate::models::DiagnosticSet;

/// Trait for rendering a diagnostic set to an output format.
pub trait OutputRenderer {
    /// Render the annotations to a string.
    fn render(&self, set: &DiagnosticSet) -> String;
}

//! The editor-side surface the review controller talks to.
//!
//! An editor integration implements [`EditorHost`] (user notifications,
//! readiness, progress and document access) and
//! [`DiagnosticSink`](crate::diagnostics::DiagnosticSink) (annotation
//! rendering). The CLI ships a terminal implementation of both.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::mapper::DocumentSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Warning => write!(f, "warning"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Current text of the document at `path`.
    ///
    /// Editors should return the live buffer, unsaved edits included. The
    /// default reads the file from disk.
    async fn open_document(&self, path: &Path) -> std::io::Result<DocumentSnapshot> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(DocumentSnapshot::from_text(&text))
    }

    /// Show a one-line message to the user.
    fn notify(&self, level: NotificationLevel, message: &str);

    /// Whether the review actions should be offered.
    fn set_ready(&self, ready: bool);

    /// Progress text for an ongoing review. Called repeatedly while a
    /// cycle runs.
    fn progress(&self, message: &str);
}

//! Terminal stand-ins for an editor: a host that reports on stderr and
//! diagnostic sinks that print or buffer annotations.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use colored::Colorize;

use crate::diagnostics::DiagnosticSink;
use crate::host::{EditorHost, NotificationLevel};
use crate::models::{DiagnosticSet, PositionedAnnotation};
use crate::output::terminal::TerminalRenderer;

/// Reports notifications and progress on stderr.
pub struct TerminalHost {
    quiet: bool,
    /// Progress only redraws in place on a real terminal.
    interactive: bool,
    /// A progress line is on screen and must be wiped before the next write.
    progress_shown: AtomicBool,
    ready: AtomicBool,
}

impl TerminalHost {
    /// `quiet` suppresses progress and info notifications.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            interactive: std::io::stderr().is_terminal(),
            progress_shown: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn clear_progress(&self, out: &mut impl Write) {
        if self.progress_shown.swap(false, Ordering::SeqCst) {
            let _ = write!(out, "\r\x1b[2K");
        }
    }
}

impl EditorHost for TerminalHost {
    fn notify(&self, level: NotificationLevel, message: &str) {
        if self.quiet && level == NotificationLevel::Info {
            return;
        }
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        self.clear_progress(&mut handle);
        let icon = match level {
            NotificationLevel::Info => "ℹ".blue().bold(),
            NotificationLevel::Warning => "⚠".yellow().bold(),
            NotificationLevel::Error => "✖".red().bold(),
        };
        let _ = writeln!(handle, "  {icon} {message}");
        let _ = handle.flush();
    }

    fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
        tracing::debug!(ready, "host readiness changed");
    }

    fn progress(&self, message: &str) {
        if self.quiet || !self.interactive {
            return;
        }
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        let _ = write!(handle, "\r\x1b[2K  {}", message.dimmed());
        let _ = handle.flush();
        self.progress_shown.store(true, Ordering::SeqCst);
    }
}

/// Prints annotations as they are rendered.
///
/// Printed lines cannot be taken back, so clearing prints a one-line note
/// marking everything above it as withdrawn.
pub struct TerminalSink {
    out: Mutex<Box<dyn Write + Send>>,
    /// Annotations were printed since the last clear.
    printed: AtomicBool,
}

impl TerminalSink {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            printed: AtomicBool::new(false),
        }
    }

    fn write(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

impl DiagnosticSink for TerminalSink {
    fn set(&self, file: &str, annotations: &[PositionedAnnotation]) {
        if annotations.is_empty() {
            return;
        }
        self.write(&TerminalRenderer.render_file(file, annotations));
        self.printed.store(true, Ordering::SeqCst);
    }

    fn clear(&self) {
        if self.printed.swap(false, Ordering::SeqCst) {
            self.write(&format!("  {}\n", "── annotations cleared ──".dimmed()));
        }
    }
}

/// Keeps whatever is currently rendered in memory.
///
/// Used by the one-shot `review` command, which prints the final state
/// once the cycle is over.
#[derive(Default)]
pub struct BufferedSink {
    shown: Mutex<DiagnosticSet>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of what is currently rendered.
    pub fn snapshot(&self) -> DiagnosticSet {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for BufferedSink {
    fn set(&self, file: &str, annotations: &[PositionedAnnotation]) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace_file(file, annotations.to_vec());
    }

    fn clear(&self) {
        *self.shown.lock().unwrap_or_else(PoisonError::into_inner) = DiagnosticSet::new();
    }
}

//! Diagnostics store: owns the latest annotation set and decides what is
//! rendered through the host's [`DiagnosticSink`].

use std::sync::Arc;

use crate::models::{DiagnosticSet, PositionedAnnotation};

/// Where annotations are drawn.
pub trait DiagnosticSink: Send + Sync {
    /// Render `annotations` for `file`, replacing whatever it showed before.
    fn set(&self, file: &str, annotations: &[PositionedAnnotation]);

    /// Remove every rendered annotation.
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

/// Latest review result plus its visibility.
///
/// `current` is `None` until the first set is stored. Hiding never drops
/// the cached set; only [`DiagnosticsStore::dispose`] does.
pub struct DiagnosticsStore {
    sink: Arc<dyn DiagnosticSink>,
    visibility: Visibility,
    current: Option<DiagnosticSet>,
}

impl DiagnosticsStore {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            visibility: Visibility::Shown,
            current: None,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn current(&self) -> Option<&DiagnosticSet> {
        self.current.as_ref()
    }

    /// Swap in a new set. Everything rendered before is cleared first, so
    /// files missing from `set` lose their annotations.
    pub fn replace_all(&mut self, set: DiagnosticSet) {
        self.sink.clear();
        if self.visibility == Visibility::Shown {
            self.render(&set);
        }
        tracing::debug!(
            files = set.file_count(),
            annotations = set.len(),
            visibility = ?self.visibility,
            "diagnostics replaced"
        );
        self.current = Some(set);
    }

    /// Flip between shown and hidden. Returns the new state, or `None`
    /// when nothing has been produced yet.
    pub fn toggle_visibility(&mut self) -> Option<Visibility> {
        let set = self.current.as_ref()?;
        self.visibility = match self.visibility {
            Visibility::Shown => {
                self.sink.clear();
                Visibility::Hidden
            }
            Visibility::Hidden => {
                self.render(set);
                Visibility::Shown
            }
        };
        Some(self.visibility)
    }

    /// Clear the sink and forget the cached set.
    pub fn dispose(&mut self) {
        self.sink.clear();
        self.current = None;
    }

    fn render(&self, set: &DiagnosticSet) {
        for (file, annotations) in set.iter() {
            self.sink.set(file, annotations);
        }
    }
}

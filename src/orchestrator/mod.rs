//! Review controller: runs review cycles and exposes the user actions.
//!
//! One cycle is change tracking → prompt → completion → parsing →
//! mapping → publishing. Cycles never overlap. A trigger that arrives
//! while one is running is parked, and the running cycle picks up the
//! most recent parked request when it finishes; older parked requests
//! are dropped.

pub mod debounce;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::changes::{ChangeError, ChangeTracker};
use crate::config::{ConfigError, SettingsStore};
use crate::diagnostics::{DiagnosticSink, DiagnosticsStore, Visibility};
use crate::host::{EditorHost, NotificationLevel};
use crate::mapper::{DocumentSnapshot, resolve_all};
use crate::models::DiagnosticSet;
use crate::parser::collect_findings;
use crate::progress::ProgressGuard;
use crate::prompt::{DEFAULT_MAX_FINDINGS, PromptOptions, build_prompt};
use crate::providers::{CompletionClient, ProviderError};

pub use debounce::SaveDebouncer;

/// Errors that abort a review cycle.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Changes(#[from] ChangeError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// What a single cycle produced. Each outcome maps to exactly one user
/// notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Nothing differs from the last commit.
    NoChanges,
    /// The model reported nothing that could be placed.
    NoFindings { files: usize },
    Published { files: usize, annotations: usize },
    Failed(String),
}

impl ReviewOutcome {
    pub fn level(&self) -> NotificationLevel {
        match self {
            ReviewOutcome::Failed(_) => NotificationLevel::Error,
            _ => NotificationLevel::Info,
        }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewOutcome::NoChanges => write!(f, "No changes found to review."),
            ReviewOutcome::NoFindings { files } => write!(
                f,
                "Review complete: no findings in {files} changed {}.",
                plural(*files, "file", "files")
            ),
            ReviewOutcome::Published { files, annotations } => write!(
                f,
                "Review complete: {annotations} {} in {files} {}.",
                plural(*annotations, "finding", "findings"),
                plural(*files, "file", "files")
            ),
            ReviewOutcome::Failed(reason) => write!(f, "Review failed: {reason}"),
        }
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Which files a cycle should look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewRequest {
    /// Every changed file in the workspace.
    All,
    /// Only these changed files (absolute or workspace-relative).
    Documents(Vec<PathBuf>),
}

/// What started a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Save,
}

/// A request waiting for the running cycle to finish.
#[derive(Debug)]
struct Parked {
    request: ReviewRequest,
    trigger: Trigger,
}

#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub max_findings: usize,
    /// Quiet period before a save-triggered review.
    pub debounce: Duration,
    pub progress_interval: Duration,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            max_findings: DEFAULT_MAX_FINDINGS,
            debounce: Duration::from_millis(1000),
            progress_interval: Duration::from_millis(100),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wires the pipeline together and owns the shared state: the
/// diagnostics store, the auto-review flag and the save hook.
///
/// Always used behind an `Arc`; save-triggered reviews run on spawned
/// tasks that hold a weak reference back to it.
pub struct ReviewController {
    tracker: ChangeTracker,
    client: CompletionClient,
    host: Arc<dyn EditorHost>,
    settings: Arc<dyn SettingsStore>,
    options: ReviewOptions,
    store: Mutex<DiagnosticsStore>,
    /// Held for the duration of a cycle.
    cycle: tokio::sync::Mutex<()>,
    /// Latest request that arrived while a cycle was running.
    pending: Mutex<Option<Parked>>,
    ready: AtomicBool,
    auto_review: AtomicBool,
    save_hook: Mutex<Option<SaveDebouncer>>,
}

impl ReviewController {
    pub fn new(
        tracker: ChangeTracker,
        client: CompletionClient,
        host: Arc<dyn EditorHost>,
        sink: Arc<dyn DiagnosticSink>,
        settings: Arc<dyn SettingsStore>,
        options: ReviewOptions,
        auto_review: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            tracker,
            client,
            host,
            settings,
            options,
            store: Mutex::new(DiagnosticsStore::new(sink)),
            cycle: tokio::sync::Mutex::new(()),
            pending: Mutex::new(None),
            ready: AtomicBool::new(false),
            auto_review: AtomicBool::new(auto_review),
            save_hook: Mutex::new(None),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn auto_review_enabled(&self) -> bool {
        self.auto_review.load(Ordering::SeqCst)
    }

    pub fn save_hook_installed(&self) -> bool {
        lock(&self.save_hook).is_some()
    }

    /// The most recent published set, shown or not.
    pub fn current_diagnostics(&self) -> Option<DiagnosticSet> {
        lock(&self.store).current().cloned()
    }

    pub fn visibility(&self) -> Visibility {
        lock(&self.store).visibility()
    }

    /// Check that there is a repository to diff and a model to ask.
    ///
    /// Only the backend check is retried.
    pub async fn validate_prerequisites(&self) -> Result<(), ReviewError> {
        self.tracker.check_environment().await?;
        self.client.check_available().await?;
        Ok(())
    }

    /// Validate prerequisites, then mark the controller ready and install
    /// the save hook if auto-review is on. A failure is reported to the
    /// user once and leaves the controller not ready.
    pub async fn activate(&self) -> Result<(), ReviewError> {
        if let Err(e) = self.validate_prerequisites().await {
            tracing::warn!(error = %e, "prerequisites not met");
            self.host.notify(NotificationLevel::Error, &e.to_string());
            self.ready.store(false, Ordering::SeqCst);
            self.host.set_ready(false);
            return Err(e);
        }

        self.ready.store(true, Ordering::SeqCst);
        self.host.set_ready(true);
        if self.auto_review_enabled() {
            self.install_save_hook();
        }
        tracing::info!("review controller ready");
        Ok(())
    }

    /// Review every changed file.
    pub async fn review_now(&self) -> Option<ReviewOutcome> {
        self.request_review(ReviewRequest::All).await
    }

    /// Run a cycle for `request`, or park it if one is already running.
    ///
    /// Returns the outcome of the last cycle this call ran, or `None` when
    /// the request was handed to the cycle already in flight.
    pub async fn request_review(&self, request: ReviewRequest) -> Option<ReviewOutcome> {
        self.enqueue(request, Trigger::Manual).await
    }

    async fn enqueue(&self, request: ReviewRequest, trigger: Trigger) -> Option<ReviewOutcome> {
        let cycle = {
            let mut pending = lock(&self.pending);
            match self.cycle.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!(?request, ?trigger, "review in flight, parking request");
                    *pending = Some(Parked { request, trigger });
                    return None;
                }
            }
        };

        let mut request = request;
        loop {
            let outcome = self.run_cycle(&request).await;

            let mut pending = lock(&self.pending);
            match pending.take() {
                Some(next) => request = next.request,
                None => {
                    // Released under the pending lock so a parked request
                    // can never be left behind.
                    drop(cycle);
                    return Some(outcome);
                }
            }
        }
    }

    async fn run_cycle(&self, request: &ReviewRequest) -> ReviewOutcome {
        let progress = ProgressGuard::start(
            self.host.clone(),
            "Reviewing changes",
            self.options.progress_interval,
        );
        let outcome = match self.execute(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "review cycle failed");
                ReviewOutcome::Failed(e.to_string())
            }
        };
        drop(progress);

        tracing::info!(?outcome, "review cycle finished");
        self.host.notify(outcome.level(), &outcome.to_string());
        outcome
    }

    async fn execute(&self, request: &ReviewRequest) -> Result<ReviewOutcome, ReviewError> {
        let only = match request {
            ReviewRequest::All => None,
            ReviewRequest::Documents(paths) => Some(paths.as_slice()),
        };
        let files = self.tracker.changed_files(only).await?;
        if files.is_empty() {
            return Ok(ReviewOutcome::NoChanges);
        }

        let prompt = build_prompt(
            &files,
            &PromptOptions {
                max_findings: self.options.max_findings,
            },
        );
        tracing::debug!(files = files.len(), prompt_bytes = prompt.len(), "prompt built");

        let stream = self.client.complete(&prompt).await?;
        let findings = collect_findings(stream).await?;

        let mut documents: HashMap<String, DocumentSnapshot> = HashMap::new();
        for file in &files {
            match self.host.open_document(&file.absolute_path).await {
                Ok(doc) => {
                    documents.insert(file.path.clone(), doc);
                }
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "cannot open document, skipping");
                }
            }
        }

        let set = resolve_all(&findings, &documents);
        let outcome = if set.is_empty() {
            ReviewOutcome::NoFindings { files: files.len() }
        } else {
            ReviewOutcome::Published {
                files: set.file_count(),
                annotations: set.len(),
            }
        };
        lock(&self.store).replace_all(set);
        Ok(outcome)
    }

    /// Flip auto-review on save, persist it, and install or remove the
    /// save hook to match. Returns the new state.
    pub fn toggle_auto_review(&self) -> Result<bool, ConfigError> {
        let enabled = !self.auto_review_enabled();
        if let Err(e) = self.settings.set_auto_review(enabled) {
            self.host.notify(
                NotificationLevel::Error,
                &format!("Could not save auto-review setting: {e}"),
            );
            return Err(e);
        }

        self.auto_review.store(enabled, Ordering::SeqCst);
        if enabled {
            self.install_save_hook();
        } else {
            self.uninstall_save_hook();
        }
        self.host.notify(
            NotificationLevel::Info,
            if enabled {
                "Auto-review on save enabled."
            } else {
                "Auto-review on save disabled."
            },
        );
        Ok(enabled)
    }

    /// Show or hide the current annotations.
    pub fn toggle_visibility(&self) -> Option<Visibility> {
        let toggled = lock(&self.store).toggle_visibility();
        if toggled.is_none() {
            self.host
                .notify(NotificationLevel::Info, "No review results to show yet.");
        }
        toggled
    }

    /// Save notification from the host. With the save hook installed this
    /// (re)starts the debounce timer for a review of `documents`.
    pub fn document_saved(self: &Arc<Self>, documents: Vec<PathBuf>) {
        let mut hook = lock(&self.save_hook);
        let Some(debouncer) = hook.as_mut() else {
            return;
        };
        let controller = Arc::downgrade(self);
        debouncer.schedule(move || async move {
            if let Some(controller) = controller.upgrade() {
                if !controller.save_hook_installed() {
                    return;
                }
                controller
                    .enqueue(ReviewRequest::Documents(documents), Trigger::Save)
                    .await;
            }
        });
    }

    /// Start reacting to saves. Calling it again is a no-op.
    pub fn install_save_hook(&self) {
        let mut hook = lock(&self.save_hook);
        if hook.is_none() {
            *hook = Some(SaveDebouncer::new(self.options.debounce));
            tracing::debug!("save hook installed");
        }
    }

    /// Stop reacting to saves and drop any pending save-triggered review.
    /// Calling it again is a no-op.
    pub fn uninstall_save_hook(&self) {
        if lock(&self.save_hook).take().is_some() {
            tracing::debug!("save hook removed");
        }
        let mut pending = lock(&self.pending);
        if pending.as_ref().is_some_and(|p| p.trigger == Trigger::Save) {
            tracing::debug!("dropping parked save-triggered review");
            *pending = None;
        }
    }

    /// Remove the hook and every rendered annotation.
    pub fn shutdown(&self) {
        self.uninstall_save_hook();
        lock(&self.store).dispose();
        self.ready.store(false, Ordering::SeqCst);
        self.host.set_ready(false);
    }
}

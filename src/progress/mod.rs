//! Progress ticking for an in-flight review.
//!
//! A review cycle starts a [`ProgressGuard`]; a background task pushes a
//! spinner frame to the host on every interval until the guard drops.
//! Dropping is the only way to stop it, so every exit path of the cycle
//! stops the ticker.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::host::EditorHost;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Smallest tick accepted; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Stops the progress task when dropped.
#[must_use = "the ticker stops as soon as the guard is dropped"]
pub struct ProgressGuard {
    handle: JoinHandle<()>,
}

impl ProgressGuard {
    /// Spawn a ticker reporting `message` to `host` every `interval`.
    pub fn start(host: Arc<dyn EditorHost>, message: impl Into<String>, interval: Duration) -> Self {
        let message = message.into();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            let mut frame = 0usize;
            loop {
                ticker.tick().await;
                host.progress(&format!("{} {message}", FRAMES[frame % FRAMES.len()]));
                frame = frame.wrapping_add(1);
            }
        });
        Self { handle }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

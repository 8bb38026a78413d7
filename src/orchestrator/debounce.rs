//! Trailing-edge debounce for save-triggered reviews.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs the most recently scheduled job once no new job has been
/// scheduled for `delay`.
///
/// The job itself is spawned as its own task once the timer fires, so
/// rescheduling or dropping the debouncer only ever cancels a pending
/// timer, never a job that has already started.
#[derive(Debug)]
pub struct SaveDebouncer {
    delay: Duration,
    timer: Option<JoinHandle<()>>,
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, timer: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending job with `job`, restarting the quiet period.
    pub fn schedule<F, Fut>(&mut self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(job());
        }));
    }

    /// Drop the pending job, if any.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Whether a job is waiting for its quiet period to end.
    pub fn is_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SaveDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Completion client: backend selection plus retry.

use std::sync::Arc;

use crate::retry::RetryPolicy;

use super::{BackendSelector, ProviderError, TextStream, is_retryable};

/// Sends prompts through whichever backend the selector currently offers.
#[derive(Clone)]
pub struct CompletionClient {
    selector: Arc<dyn BackendSelector>,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(selector: Arc<dyn BackendSelector>, policy: RetryPolicy) -> Self {
        Self { selector, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `prompt` and return the response stream.
    ///
    /// Every attempt re-selects the backend. Transient failures while
    /// establishing the response are retried; once the stream is handed
    /// out, errors inside it are the caller's.
    pub async fn complete(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        self.policy
            .run(
                "completion",
                |attempt| async move {
                    let backend = self.selector.select().await?;
                    tracing::debug!(backend = backend.name(), attempt, "sending prompt");
                    backend.stream(prompt).await
                },
                is_retryable,
            )
            .await
    }

    /// Confirm a backend can be selected, waiting out a model that is
    /// not available yet. Configuration errors fail on the first attempt.
    pub async fn check_available(&self) -> Result<(), ProviderError> {
        self.policy
            .run(
                "backend check",
                |_| async move { self.selector.select().await.map(|_| ()) },
                |e| matches!(e, ProviderError::NoModelAvailable(_)) || is_retryable(e),
            )
            .await
    }
}

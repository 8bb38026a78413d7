//! Completion backends and backend selection.
//!
//! Provides an abstraction layer over rig-core and the OpenAI-compatible
//! streaming endpoint so the review pipeline only ever sees a stream of
//! text fragments.

pub mod client;
pub mod openai_stream;
pub mod rig;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::ProviderConfig;

pub use client::CompletionClient;
pub use openai_stream::OpenAiStreamBackend;
pub use rig::RigBackend;

/// Errors from completion backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("no language model available: {0}")]
    NoModelAvailable(String),

    #[error("response stream failed: {0}")]
    Stream(String),
}

/// Lazy, finite sequence of response text fragments.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

/// A chat-completion service that can answer a single prompt.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Send `prompt` and return the response as it arrives.
    ///
    /// Errors returned here happen before any text is produced; errors
    /// inside the stream happen after.
    async fn stream(&self, prompt: &str) -> Result<TextStream, ProviderError>;
}

/// Picks the backend to use for the next request.
#[async_trait]
pub trait BackendSelector: Send + Sync {
    async fn select(&self) -> Result<Arc<dyn CompletionBackend>, ProviderError>;
}

/// Selects a backend from [`ProviderConfig`].
///
/// Streaming goes through [`OpenAiStreamBackend`] when enabled and the
/// provider speaks the OpenAI wire format; everything else uses rig-core.
#[derive(Debug, Clone)]
pub struct ConfiguredSelector {
    config: ProviderConfig,
}

impl ConfiguredSelector {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendSelector for ConfiguredSelector {
    async fn select(&self) -> Result<Arc<dyn CompletionBackend>, ProviderError> {
        let config = &self.config;
        // Misconfiguration is reported as `NotConfigured`, which is never retried.
        if config.model.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "no model configured for provider '{}'",
                config.name
            )));
        }
        if config.api_key.is_none() && !config.name.key_optional() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key found for provider '{}'. Set {} or {}.",
                config.name,
                crate::constants::ENV_API_KEY,
                config.name.api_key_env_var()
            )));
        }

        if config.streaming() && config.name.speaks_openai_wire() {
            let backend = OpenAiStreamBackend::new(
                config.base_url.as_deref(),
                config.api_key.clone(),
                &config.model,
                Duration::from_secs(config.timeout_secs),
            )?;
            return Ok(Arc::new(backend));
        }
        if config.streaming() {
            tracing::debug!(provider = %config.name, "streaming not supported, using one-shot");
        }

        Ok(Arc::new(RigBackend::new(config.clone())?))
    }
}

/// Check whether a provider error is transient and worth retrying.
///
/// Matches HTTP status codes commonly used for rate limiting and
/// temporary unavailability: 429 (Too Many Requests), 502, 503 (Service
/// Unavailable), 529 (Overloaded), and connection/timeout errors.
pub fn is_retryable(err: &ProviderError) -> bool {
    classify_error(err).is_some()
}

/// Classifies a provider error into a short, user-friendly message.
///
/// Returns `Some(message)` for transient/retryable errors, `None` otherwise.
pub fn classify_error(err: &ProviderError) -> Option<&'static str> {
    match err {
        ProviderError::ApiError(msg) | ProviderError::Stream(msg) => {
            let msg_lower = msg.to_lowercase();
            if msg_lower.contains("429")
                || msg_lower.contains("rate limit")
                || msg_lower.contains("too many requests")
            {
                Some("Rate limited by API")
            } else if msg_lower.contains("503")
                || msg_lower.contains("service unavailable")
                || msg_lower.contains("high demand")
            {
                Some("High model load")
            } else if msg_lower.contains("529") || msg_lower.contains("overloaded") {
                Some("API overloaded")
            } else if msg_lower.contains("502") {
                Some("API gateway error")
            } else if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
                Some("Request timed out")
            } else if msg_lower.contains("connection") {
                Some("Connection error")
            } else if msg_lower.contains("temporarily") || msg_lower.contains("try again") {
                Some("Temporary API error")
            } else {
                None
            }
        }
        _ => None,
    }
}

//! rig-core integration for one-shot completions.
//!
//! Uses rig-core's provider clients and Agent abstraction for multi-provider
//! support. Currently supports: Anthropic, OpenAI, Cohere, Gemini, Perplexity,
//! DeepSeek, xAI, Groq, and any OpenAI-compatible API.
//!
//! rig-core returns the whole response at once, so the resulting
//! [`TextStream`] carries a single fragment.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rig::client::CompletionClient as _;
use rig::completion::Prompt;
use rig::providers;

use crate::config::ProviderConfig;
use crate::models::ProviderName;

use super::{CompletionBackend, ProviderError, TextStream};

/// Maximum tokens per LLM completion response.
///
/// Set high enough to accommodate thinking models (e.g. Gemini 2.5 Pro)
/// that consume part of the budget for internal reasoning tokens.
const MAX_TOKENS: u64 = 65536;

/// Build an agent from a rig-core client and prompt it.
///
/// Always sets `max_tokens`: without it some providers (e.g. Gemini)
/// default to a low limit that truncates responses.
macro_rules! prompt_once {
    ($client:expr, $model:expr, $prompt:expr, $label:expr) => {{
        let agent = $client
            .agent($model)
            .temperature(0.0)
            .max_tokens(MAX_TOKENS)
            .build();
        agent
            .prompt($prompt)
            .await
            .map_err(|e| ProviderError::ApiError(format!("{} API error: {e}", $label)))
    }};
}

/// Create a rig-core client using the `Client::new(api_key)` convention.
macro_rules! new_client {
    ($provider_mod:path, $api_key:expr, $label:expr) => {{
        <$provider_mod>::new($api_key).map_err(|e| {
            ProviderError::ApiError(format!("failed to create {} client: {e}", $label))
        })
    }};
}

/// rig-core based completion backend.
///
/// The provider name in config selects which rig-core provider to use.
pub struct RigBackend {
    config: ProviderConfig,
    label: String,
    timeout: Duration,
}

impl RigBackend {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() && !config.name.key_optional() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key found for provider '{}'. Set {} or the provider-specific env var.",
                config.name,
                crate::constants::ENV_API_KEY
            )));
        }
        if config.name == ProviderName::OpenAICompatible && config.base_url.is_none() {
            return Err(ProviderError::NotConfigured(
                "openai-compatible provider requires base_url to be set".to_string(),
            ));
        }
        Ok(Self {
            label: config.name.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            config,
        })
    }

    /// Build an OpenAI-style client, optionally with a custom base URL.
    fn build_openai_client(
        &self,
        api_key: &str,
    ) -> Result<providers::openai::CompletionsClient, ProviderError> {
        let mut builder = providers::openai::CompletionsClient::builder().api_key(api_key);
        if let Some(ref base_url) = self.config.base_url {
            builder = builder.base_url(base_url);
        }
        let client: providers::openai::CompletionsClient = builder
            .build()
            .map_err(|e| ProviderError::ApiError(format!("failed to create OpenAI client: {e}")))?;
        Ok(client)
    }

    /// Make a completion call through rig-core and return the raw response text.
    async fn call_rig(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let model = self.config.model.as_str();

        match self.config.name {
            ProviderName::Anthropic => {
                let client: providers::anthropic::Client = providers::anthropic::Client::builder()
                    .api_key(api_key)
                    .build()
                    .map_err(|e| {
                        ProviderError::ApiError(format!("failed to create Anthropic client: {e}"))
                    })?;
                prompt_once!(client, model, prompt, "Anthropic")
            }
            ProviderName::OpenAI => {
                let client = self.build_openai_client(api_key)?;
                prompt_once!(client, model, prompt, "OpenAI")
            }
            ProviderName::Cohere => {
                let client = new_client!(providers::cohere::Client, api_key, "Cohere")?;
                prompt_once!(client, model, prompt, "Cohere")
            }
            ProviderName::Gemini => {
                let client = new_client!(providers::gemini::Client, api_key, "Gemini")?;
                prompt_once!(client, model, prompt, "Gemini")
            }
            ProviderName::Perplexity => {
                let client = new_client!(providers::perplexity::Client, api_key, "Perplexity")?;
                prompt_once!(client, model, prompt, "Perplexity")
            }
            ProviderName::DeepSeek => {
                let client = new_client!(providers::deepseek::Client, api_key, "DeepSeek")?;
                prompt_once!(client, model, prompt, "DeepSeek")
            }
            ProviderName::XAI => {
                let client = new_client!(providers::xai::Client, api_key, "xAI")?;
                prompt_once!(client, model, prompt, "xAI")
            }
            ProviderName::Groq => {
                let client = new_client!(providers::groq::Client, api_key, "Groq")?;
                prompt_once!(client, model, prompt, "Groq")
            }
            ProviderName::OpenAICompatible => {
                let client = self.build_openai_client(api_key)?;
                prompt_once!(client, model, prompt, "OpenAI-compatible")
            }
        }
    }
}

#[async_trait]
impl CompletionBackend for RigBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let text = tokio::time::timeout(self.timeout, self.call_rig(prompt))
            .await
            .map_err(|_| {
                ProviderError::ApiError(format!(
                    "{} request timed out after {}s",
                    self.label,
                    self.timeout.as_secs()
                ))
            })??;

        tracing::debug!(backend = %self.label, bytes = text.len(), "received response");
        Ok(futures::stream::iter([Ok(text)]).boxed())
    }
}

//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.quibble.toml` in the workspace root
//! 4. `~/.config/quibble/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{
    ENV_API_KEY, ENV_AUTO_REVIEW, ENV_BASE_URL, ENV_MODEL, ENV_PROVIDER, ENV_STREAM,
};
use crate::env::Env;
use crate::models::ProviderName;
use crate::prompt::DEFAULT_MAX_FINDINGS;

/// Errors during config loading and persistence.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub review: ReviewConfig,
    pub retry: RetryConfig,
}

/// Chat-completion backend configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Stream the response over server-sent events where the provider
    /// supports it. `None` when no layer set it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Upper bound on a single non-streaming request.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("stream", &self.stream)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            api_key: None,
            stream: None,
            timeout_secs: 120,
        }
    }
}

impl ProviderConfig {
    pub fn streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// Review-cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Cap on findings requested from the model.
    pub max_findings: usize,
    /// Review automatically after saves. `None` when no layer set it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_review_on_save: Option<bool>,
    /// Quiet period before a save-triggered review starts.
    pub debounce_ms: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_findings: DEFAULT_MAX_FINDINGS,
            auto_review_on_save: None,
            debounce_ms: 1000,
        }
    }
}

impl ReviewConfig {
    pub fn auto_review_enabled(&self) -> bool {
        self.auto_review_on_save.unwrap_or(false)
    }
}

/// Retry policy for backend selection and completion requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, repo-local config, then applies
    /// environment variable overrides.
    pub fn load(repo_root: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        Self::load_layers(Self::global_config_path().as_deref(), repo_root, env)
    }

    /// Like [`Config::load`], but with an explicit global config file.
    /// `None` skips the global layer.
    pub fn load_layers(
        global_path: Option<&Path>,
        repo_root: Option<&Path>,
        env: &Env,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let global = Self::load_file(global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: repo-local config
        if let Some(root) = repo_root {
            let local_path = Self::repo_config_path(root);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Path of the workspace-local config file.
    pub fn repo_config_path(root: &Path) -> PathBuf {
        root.join(crate::constants::CONFIG_FILENAME)
    }

    /// Merge another config into this one (other takes precedence for
    /// non-default values).
    fn merge(&mut self, other: Config) {
        // Provider settings
        let default_provider = ProviderConfig::default();
        if other.provider.name != default_provider.name {
            self.provider.name = other.provider.name;
        }
        if other.provider.model != default_provider.model {
            self.provider.model = other.provider.model;
        }
        if other.provider.base_url.is_some() {
            self.provider.base_url = other.provider.base_url;
        }
        if other.provider.api_key.is_some() {
            self.provider.api_key = other.provider.api_key;
        }
        if other.provider.stream.is_some() {
            self.provider.stream = other.provider.stream;
        }
        if other.provider.timeout_secs != default_provider.timeout_secs {
            self.provider.timeout_secs = other.provider.timeout_secs;
        }

        // Review settings
        let default_review = ReviewConfig::default();
        if other.review.max_findings != default_review.max_findings {
            self.review.max_findings = other.review.max_findings;
        }
        if other.review.auto_review_on_save.is_some() {
            self.review.auto_review_on_save = other.review.auto_review_on_save;
        }
        if other.review.debounce_ms != default_review.debounce_ms {
            self.review.debounce_ms = other.review.debounce_ms;
        }

        // Retry settings
        let default_retry = RetryConfig::default();
        if other.retry.max_attempts != default_retry.max_attempts {
            self.retry.max_attempts = other.retry.max_attempts;
        }
        if other.retry.initial_backoff_ms != default_retry.initial_backoff_ms {
            self.retry.initial_backoff_ms = other.retry.initial_backoff_ms;
        }
        if other.retry.max_backoff_ms != default_retry.max_backoff_ms {
            self.retry.max_backoff_ms = other.retry.max_backoff_ms;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(val) = env.var(ENV_PROVIDER) {
            if let Ok(name) = val.parse::<ProviderName>() {
                self.provider.name = name;
            } else {
                tracing::warn!("ignoring invalid {ENV_PROVIDER} value: {val}");
            }
        }
        if let Ok(val) = env.var(ENV_MODEL) {
            self.provider.model = val;
        }
        if let Ok(val) = env.var(ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env
            .var(ENV_API_KEY)
            .or_else(|_| env.var(self.provider.name.api_key_env_var()))
            .ok();
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }

        match env.flag(ENV_STREAM) {
            Some(Ok(on)) => self.provider.stream = Some(on),
            Some(Err(val)) => tracing::warn!("ignoring invalid {ENV_STREAM} value: {val}"),
            None => {}
        }
        match env.flag(ENV_AUTO_REVIEW) {
            Some(Ok(on)) => self.review.auto_review_on_save = Some(on),
            Some(Err(val)) => tracing::warn!("ignoring invalid {ENV_AUTO_REVIEW} value: {val}"),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> Env {
        Env::mock(Vec::<(&str, &str)>::new())
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.provider.model, "claude-sonnet-4-20250514");
        assert!(!config.provider.streaming());
        assert_eq!(config.review.max_findings, 10);
        assert_eq!(config.review.debounce_ms, 1000);
        assert!(!config.review.auto_review_enabled());
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[provider]
name = "openai-compatible"
model = "llama3"
base_url = "http://localhost:11434/v1"
stream = true

[review]
max_findings = 5
auto_review_on_save = true
debounce_ms = 250

[retry]
max_attempts = 2
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.name, ProviderName::OpenAICompatible);
        assert_eq!(config.provider.model, "llama3");
        assert!(config.provider.streaming());
        assert_eq!(config.review.max_findings, 5);
        assert!(config.review.auto_review_enabled());
        assert_eq!(config.review.debounce_ms, 250);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.max_backoff_ms, 30_000);
    }

    #[test]
    fn merge_overrides_non_default_values() {
        let mut base = Config::default();
        let mut other = Config::default();

        other.provider.name = ProviderName::OpenAI;
        other.provider.model = "gpt-4o".to_string();
        other.provider.base_url = Some("https://custom.api".to_string());
        other.provider.api_key = Some("sk-test".to_string());
        other.provider.stream = Some(true);
        other.provider.timeout_secs = 30;
        other.review.max_findings = 3;
        other.review.auto_review_on_save = Some(true);
        other.review.debounce_ms = 500;
        other.retry.max_attempts = 6;
        other.retry.initial_backoff_ms = 200;
        other.retry.max_backoff_ms = 5000;

        base.merge(other);

        assert_eq!(base.provider.name, ProviderName::OpenAI);
        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.provider.base_url, Some("https://custom.api".to_string()));
        assert_eq!(base.provider.api_key, Some("sk-test".to_string()));
        assert!(base.provider.streaming());
        assert_eq!(base.provider.timeout_secs, 30);
        assert_eq!(base.review.max_findings, 3);
        assert_eq!(base.review.auto_review_on_save, Some(true));
        assert_eq!(base.review.debounce_ms, 500);
        assert_eq!(
            base.retry,
            RetryConfig {
                max_attempts: 6,
                initial_backoff_ms: 200,
                max_backoff_ms: 5000
            }
        );
    }

    #[test]
    fn merge_keeps_base_when_other_is_default() {
        let mut base = Config::default();
        base.provider.name = ProviderName::OpenAI;
        base.provider.model = "gpt-4o".to_string();
        base.review.auto_review_on_save = Some(true);

        base.merge(Config::default());

        assert_eq!(base.provider.name, ProviderName::OpenAI);
        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.review.auto_review_on_save, Some(true));
    }

    #[test]
    fn explicit_false_auto_review_overrides_lower_layer() {
        let mut base = Config::default();
        base.review.auto_review_on_save = Some(true);
        let other: Config = toml::from_str("[review]\nauto_review_on_save = false\n").unwrap();
        base.merge(other);
        assert!(!base.review.auto_review_enabled());
    }

    #[test]
    fn load_file_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{ toml").unwrap();

        let err = Config::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn load_file_not_found() {
        let err = Config::load_file(Path::new("/tmp/quibble_not_exist_config.toml")).unwrap_err();
        assert!(err.to_string().contains("read"));
    }

    #[test]
    fn repo_layer_overrides_global_layer() {
        let global_dir = tempfile::tempdir().unwrap();
        let global = global_dir.path().join("config.toml");
        std::fs::write(
            &global,
            "[provider]\nname = \"openai\"\nmodel = \"gpt-4o\"\n\n[review]\nmax_findings = 20\n",
        )
        .unwrap();

        let repo = tempfile::tempdir().unwrap();
        std::fs::write(
            repo.path().join(".quibble.toml"),
            "[provider]\nmodel = \"gpt-4o-mini\"\n",
        )
        .unwrap();

        let config = Config::load_layers(Some(&global), Some(repo.path()), &no_env()).unwrap();
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.review.max_findings, 20);
    }

    #[test]
    fn load_without_any_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_layers(None, Some(dir.path()), &no_env()).unwrap();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
    }

    #[test]
    fn global_config_path_mentions_app() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_str().unwrap().contains("quibble"));
        }
    }

    #[test]
    fn apply_env_vars_provider_and_api_key() {
        let env = Env::mock([
            ("QUIBBLE_PROVIDER", "openai"),
            ("QUIBBLE_API_KEY", "sk-env-test"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.api_key, Some("sk-env-test".to_string()));
    }

    #[test]
    fn apply_env_vars_model_and_base_url() {
        let env = Env::mock([
            ("QUIBBLE_MODEL", "gpt-4-turbo"),
            ("QUIBBLE_BASE_URL", "https://custom.api/v1"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.model, "gpt-4-turbo");
        assert_eq!(
            config.provider.base_url,
            Some("https://custom.api/v1".to_string())
        );
    }

    #[test]
    fn apply_env_vars_invalid_provider_falls_back() {
        let env = Env::mock([("QUIBBLE_PROVIDER", "not-a-provider")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::Anthropic);
    }

    #[test]
    fn apply_env_vars_provider_specific_api_key_fallback() {
        let env = Env::mock([("ANTHROPIC_API_KEY", "sk-anthropic-test")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(
            config.provider.api_key,
            Some("sk-anthropic-test".to_string())
        );
    }

    #[test]
    fn repo_layer_can_turn_streaming_off() {
        let global = tempfile::tempdir().unwrap();
        let global_path = global.path().join("config.toml");
        std::fs::write(&global_path, "[provider]\nstream = true\n").unwrap();

        let repo = tempfile::tempdir().unwrap();
        let config = Config::load_layers(Some(&global_path), Some(repo.path()), &no_env()).unwrap();
        assert!(config.provider.streaming());

        std::fs::write(
            repo.path().join(".quibble.toml"),
            "[provider]\nstream = false\n",
        )
        .unwrap();
        let config = Config::load_layers(Some(&global_path), Some(repo.path()), &no_env()).unwrap();
        assert_eq!(config.provider.stream, Some(false));
        assert!(!config.provider.streaming());
    }

    #[test]
    fn apply_env_vars_switches() {
        let env = Env::mock([("QUIBBLE_STREAM", "yes"), ("QUIBBLE_AUTO_REVIEW", "off")]);
        let mut config = Config::default();
        config.review.auto_review_on_save = Some(true);
        config.apply_env_vars(&env);
        assert!(config.provider.streaming());
        assert_eq!(config.review.auto_review_on_save, Some(false));
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let mut config = ProviderConfig::default();
        config.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

//! Clap argument types.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use quibble::config::Config;
use quibble::models::{DiagnosticSet, ProviderName};

/// Inline AI review of locally modified files.
#[derive(Parser, Debug)]
#[command(name = "quibble", version = quibble::constants::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Review every file changed since the last commit, once.
    Review(ReviewArgs),

    /// Watch the workspace and review on demand or on save.
    Watch(WatchArgs),

    /// Turn auto-review on save on or off for this workspace.
    AutoReview(AutoReviewArgs),

    /// Print version information.
    Version,
}

/// Backend overrides shared by the reviewing commands.
#[derive(clap::Args, Debug, Default)]
pub struct BackendArgs {
    /// LLM provider (anthropic, openai, gemini, openai-compatible, ...).
    #[arg(long)]
    pub provider: Option<ProviderName>,

    /// Model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL for OpenAI-compatible endpoints.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Stream the response (OpenAI-compatible backends).
    #[arg(long, default_value_t = false)]
    pub stream: bool,

    /// Maximum number of findings to ask for.
    #[arg(long)]
    pub max_findings: Option<usize>,
}

impl BackendArgs {
    /// Apply the flags on top of the loaded config (highest priority layer).
    pub fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider.name = provider;
        }
        if let Some(ref model) = self.model {
            config.provider.model = model.clone();
        }
        if let Some(ref url) = self.base_url {
            config.provider.base_url = Some(url.clone());
        }
        if self.stream {
            config.provider.stream = Some(true);
        }
        if let Some(max) = self.max_findings {
            config.review.max_findings = max;
        }
    }
}

/// Arguments for the `review` subcommand.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    /// Path inside the repository (default: current directory).
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Only review these changed files (relative to the current directory).
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Suppress progress and informational messages.
    #[arg(long, short = 'q', default_value_t = false)]
    pub quiet: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

/// Arguments for the `watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Path inside the repository (default: current directory).
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Force auto-review on save for this session, without persisting it.
    #[arg(long, default_value_t = false)]
    pub auto_review: bool,

    #[arg(long, short = 'q', default_value_t = false)]
    pub quiet: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

/// Arguments for the `auto-review` subcommand.
#[derive(Parser, Debug)]
pub struct AutoReviewArgs {
    pub state: AutoReviewState,

    /// Path inside the repository (default: current directory).
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AutoReviewState {
    On,
    Off,
    Toggle,
    Status,
}

impl AutoReviewState {
    /// The state to persist, given the current one. `None` for `status`.
    pub fn resolve(self, current: bool) -> Option<bool> {
        match self {
            AutoReviewState::On => Some(true),
            AutoReviewState::Off => Some(false),
            AutoReviewState::Toggle => Some(!current),
            AutoReviewState::Status => None,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl OutputFormat {
    /// Render a diagnostic set using the renderer for this format.
    pub fn render(&self, set: &DiagnosticSet) -> String {
        use quibble::output::OutputRenderer;
        match self {
            OutputFormat::Terminal => quibble::output::terminal::TerminalRenderer.render(set),
            OutputFormat::Json => quibble::output::json::JsonRenderer.render(set),
        }
    }
}

//! Configuration loading and layering.
//!
//! Handles `.quibble.toml` loading, environment variable resolution,
//! CLI flag merging with proper priority ordering, and persistence of
//! the auto-review switch.

pub mod loader;
pub mod settings;

pub use loader::{Config, ConfigError, ProviderConfig, RetryConfig, ReviewConfig};
pub use settings::{RepoSettings, SettingsStore};

//! Persistence of user-toggled settings.

use std::path::PathBuf;

use super::loader::{Config, ConfigError};

/// Durable storage for settings the user flips at runtime.
pub trait SettingsStore: Send + Sync {
    fn set_auto_review(&self, enabled: bool) -> Result<(), ConfigError>;
}

/// Writes settings into the workspace's `.quibble.toml`, keeping every
/// other key in the file intact.
#[derive(Debug, Clone)]
pub struct RepoSettings {
    path: PathBuf,
}

impl RepoSettings {
    pub fn new(root: &std::path::Path) -> Self {
        Self {
            path: Config::repo_config_path(root),
        }
    }

    fn read_table(&self) -> Result<toml::Table, ConfigError> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        content.parse::<toml::Table>().map_err(|e| ConfigError::ParseFile {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl SettingsStore for RepoSettings {
    fn set_auto_review(&self, enabled: bool) -> Result<(), ConfigError> {
        let mut table = self.read_table()?;
        let review = table
            .entry("review")
            .or_insert(toml::Value::Table(toml::Table::new()));
        if !review.is_table() {
            *review = toml::Value::Table(toml::Table::new());
        }
        if let toml::Value::Table(review) = review {
            review.insert("auto_review_on_save".into(), toml::Value::Boolean(enabled));
        }

        let content = toml::to_string(&table)?;
        std::fs::write(&self.path, content).map_err(|e| ConfigError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %self.path.display(), enabled, "persisted auto-review setting");
        Ok(())
    }
}

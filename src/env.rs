//! Environment variable abstraction for testability.
//!
//! Production code uses [`Env::real()`] which delegates to [`std::env::var`].
//! Tests use [`Env::mock()`] backed by a `HashMap`, so config layering can be
//! exercised without touching the process environment.

use std::collections::HashMap;

/// Environment variable reader.
#[derive(Clone, Debug, Default)]
pub struct Env {
    overrides: Option<HashMap<String, String>>,
}

impl Env {
    /// Create an `Env` that reads from the real process environment.
    pub fn real() -> Self {
        Self { overrides: None }
    }

    /// Create an `Env` backed by explicit key-value pairs.
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            overrides: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Look up an environment variable by name.
    pub fn var(&self, name: &str) -> Result<String, std::env::VarError> {
        match &self.overrides {
            Some(map) => map.get(name).cloned().ok_or(std::env::VarError::NotPresent),
            None => std::env::var(name),
        }
    }

    /// Read a boolean switch such as `QUIBBLE_STREAM=1`.
    ///
    /// Returns `None` when the variable is absent, and `Err` with the raw
    /// value when it is present but not a recognised boolean spelling.
    pub fn flag(&self, name: &str) -> Option<Result<bool, String>> {
        let raw = self.var(name).ok()?;
        Some(match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_env_reads_cargo_manifest_dir() {
        let env = Env::real();
        assert!(env.var("CARGO_MANIFEST_DIR").is_ok());
    }

    #[test]
    fn mock_env_returns_set_values() {
        let env = Env::mock([("FOO", "bar")]);
        assert_eq!(env.var("FOO").unwrap(), "bar");
        assert!(env.var("NONEXISTENT").is_err());
    }

    #[test]
    fn flag_accepts_common_spellings() {
        let env = Env::mock([("A", "ON"), ("B", "0"), ("C", "maybe")]);
        assert_eq!(env.flag("A"), Some(Ok(true)));
        assert_eq!(env.flag("B"), Some(Ok(false)));
        assert_eq!(env.flag("C"), Some(Err("maybe".to_string())));
        assert_eq!(env.flag("D"), None);
    }
}

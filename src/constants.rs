//! App-wide constants.
//!
//! Centralises the tool name, config paths, and environment variable
//! names so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "quibble";

/// Crate version, baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local config filename (e.g. `.quibble.toml` in the workspace root).
pub const CONFIG_FILENAME: &str = ".quibble.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "quibble";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "QUIBBLE_PROVIDER";
pub const ENV_MODEL: &str = "QUIBBLE_MODEL";
pub const ENV_API_KEY: &str = "QUIBBLE_API_KEY";
pub const ENV_BASE_URL: &str = "QUIBBLE_BASE_URL";
pub const ENV_STREAM: &str = "QUIBBLE_STREAM";
pub const ENV_AUTO_REVIEW: &str = "QUIBBLE_AUTO_REVIEW";

/// Log filter directive for the `tracing` subscriber (e.g. `quibble=debug`).
pub const ENV_LOG: &str = "QUIBBLE_LOG";

//! quibble: inline AI review annotations for locally modified files
//! (library crate).
//!
//! Re-exports public modules for integration tests and editor hosts.

pub mod changes;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod diff;
pub mod env;
pub mod host;
pub mod mapper;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod progress;
pub mod prompt;
pub mod providers;
pub mod retry;

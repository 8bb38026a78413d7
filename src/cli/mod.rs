//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

use colored::Colorize;

/// Watch-mode key bindings, printed when the watcher starts.
pub const WATCH_HELP: &str = "r = review now · a = toggle auto-review · v = show/hide results · q = quit";

/// A line typed on stdin while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    Review,
    ToggleAutoReview,
    ToggleVisibility,
    Quit,
}

impl WatchCommand {
    /// Parse a typed line. Unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "r" | "review" => Some(WatchCommand::Review),
            "a" | "auto" => Some(WatchCommand::ToggleAutoReview),
            "v" | "visibility" => Some(WatchCommand::ToggleVisibility),
            "q" | "quit" | "exit" => Some(WatchCommand::Quit),
            _ => None,
        }
    }
}

/// Print the watch banner to stderr.
pub fn print_watch_banner(root: &std::path::Path, auto_review: bool) {
    eprintln!();
    eprintln!(
        "  {} {}",
        quibble::constants::APP_NAME.bold(),
        format!("· watching {}", root.display()).dimmed()
    );
    eprintln!(
        "  {} {}",
        "auto-review on save:".dimmed(),
        if auto_review { "on".green() } else { "off".yellow() }
    );
    eprintln!("  {}", WATCH_HELP.dimmed());
    eprintln!();
}

//! quibble: inline AI review annotations for locally modified files.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use quibble::changes;
use quibble::config;
use quibble::constants;
use quibble::env;
use quibble::orchestrator;
use quibble::output;
use quibble::providers;
use quibble::retry;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use changes::{ChangeTracker, GitCli};
use cli::WatchCommand;
use cli::args::{AutoReviewArgs, Cli, Command, ReviewArgs, WatchArgs};
use config::{Config, RepoSettings, SettingsStore};
use env::Env;
use orchestrator::{ReviewController, ReviewOptions, ReviewOutcome, ReviewRequest};
use output::console::{BufferedSink, TerminalHost, TerminalSink};
use providers::{CompletionClient, ConfiguredSelector};
use quibble::diagnostics::DiagnosticSink;
use quibble::host::EditorHost;
use retry::RetryPolicy;

/// Directories whose changes never trigger a review.
const IGNORED_DIRS: [&str; 3] = [".git", "target", "node_modules"];

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

/// Log to stderr, filtered by `QUIBBLE_LOG` (default: warnings only).
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(constants::ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Review(args) => run_review(args).await,
        Command::Watch(args) => run_watch(args).await,
        Command::AutoReview(args) => run_auto_review(args).await,
        Command::Version => run_version(),
    }
}

fn run_version() -> Result<()> {
    use colored::Colorize;

    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        constants::VERSION.green().bold()
    );
    Ok(())
}

/// Resolve `--path` to the repository root, or to the directory itself
/// when it is not inside a repository (activation reports that later).
async fn resolve_workspace(path: &Path) -> Result<PathBuf> {
    let base_dir = std::fs::canonicalize(path)
        .with_context(|| format!("--path directory not found: {}", path.display()))?;
    match changes::find_repo_root(&base_dir).await {
        Ok(root) => Ok(PathBuf::from(root)),
        Err(e) => {
            tracing::debug!(error = %e, "no repository root found");
            Ok(base_dir)
        }
    }
}

fn build_controller(
    root: &Path,
    config: &Config,
    host: Arc<dyn EditorHost>,
    sink: Arc<dyn DiagnosticSink>,
    auto_review: bool,
) -> Arc<ReviewController> {
    let tracker = ChangeTracker::new(Some(root.to_path_buf()), Arc::new(GitCli::default()));
    let selector = Arc::new(ConfiguredSelector::new(config.provider.clone()));
    let client = CompletionClient::new(selector, RetryPolicy::from(&config.retry));
    let options = ReviewOptions {
        max_findings: config.review.max_findings,
        debounce: Duration::from_millis(config.review.debounce_ms),
        ..ReviewOptions::default()
    };
    ReviewController::new(
        tracker,
        client,
        host,
        sink,
        Arc::new(RepoSettings::new(root)),
        options,
        auto_review,
    )
}

/// Review the working tree once and print the result.
async fn run_review(args: ReviewArgs) -> Result<()> {
    let root = resolve_workspace(&args.path).await?;
    let mut config =
        Config::load(Some(&root), &Env::real()).context("failed to load configuration")?;
    args.backend.apply(&mut config);

    let host = Arc::new(TerminalHost::new(args.quiet));
    let sink = Arc::new(BufferedSink::new());
    let controller = build_controller(&root, &config, host, sink.clone(), false);

    // Activation already told the user what is missing.
    if controller.activate().await.is_err() {
        process::exit(1);
    }

    let request = if args.files.is_empty() {
        ReviewRequest::All
    } else {
        let cwd = std::env::current_dir().context("cannot read current directory")?;
        ReviewRequest::Documents(resolve_file_args(&cwd, &args.files))
    };
    let outcome = controller.request_review(request).await;

    match outcome {
        Some(ReviewOutcome::Failed(_)) => process::exit(1),
        Some(ReviewOutcome::NoChanges) if args.format == cli::args::OutputFormat::Terminal => {}
        _ => print!("{}", args.format.render(&sink.snapshot())),
    }
    Ok(())
}

/// Watch the workspace, reviewing on save (when enabled) or on request.
async fn run_watch(args: WatchArgs) -> Result<()> {
    let root = resolve_workspace(&args.path).await?;
    let mut config =
        Config::load(Some(&root), &Env::real()).context("failed to load configuration")?;
    args.backend.apply(&mut config);
    let auto_review = args.auto_review || config.review.auto_review_enabled();

    let host = Arc::new(TerminalHost::new(args.quiet));
    let controller = build_controller(&root, &config, host, Arc::new(TerminalSink::stdout()), auto_review);
    if controller.activate().await.is_err() {
        process::exit(1);
    }

    let (tx, mut events) = tokio::sync::mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("failed to create filesystem watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .context("failed to watch workspace directory")?;

    cli::print_watch_banner(&root, auto_review);

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(Ok(event)) => {
                    let saved = saved_paths(&root, &event);
                    if !saved.is_empty() {
                        tracing::debug!(?saved, "files saved");
                        controller.document_saved(saved);
                    }
                }
                Some(Err(e)) => tracing::warn!(error = %e, "file watcher error"),
                None => break,
            },
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match WatchCommand::parse(&line) {
                    Some(WatchCommand::Review) => {
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            controller.review_now().await;
                        });
                    }
                    Some(WatchCommand::ToggleAutoReview) => {
                        // Failures were already reported through the host.
                        let _ = controller.toggle_auto_review();
                    }
                    Some(WatchCommand::ToggleVisibility) => {
                        controller.toggle_visibility();
                    }
                    Some(WatchCommand::Quit) => break,
                    None => eprintln!("  {}", cli::WATCH_HELP),
                },
                // Without stdin only saves can trigger reviews.
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot read stdin");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown();
    Ok(())
}

/// Persist or report the auto-review on save setting.
async fn run_auto_review(args: AutoReviewArgs) -> Result<()> {
    let root = resolve_workspace(&args.path).await?;
    let config = Config::load(Some(&root), &Env::real()).context("failed to load configuration")?;
    let current = config.review.auto_review_enabled();

    let enabled = match args.state.resolve(current) {
        Some(enabled) => {
            RepoSettings::new(&root)
                .set_auto_review(enabled)
                .context("failed to save auto-review setting")?;
            enabled
        }
        None => current,
    };
    println!(
        "auto-review on save: {}",
        if enabled { "on" } else { "off" }
    );
    Ok(())
}

/// Absolute paths for FILES arguments given relative to `cwd`. Symlinks
/// are resolved so they compare equal to paths under the canonical root.
fn resolve_file_args(cwd: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|file| {
            let joined = cwd.join(file);
            std::fs::canonicalize(&joined).unwrap_or(joined)
        })
        .collect()
}

/// Files created or written by `event`, skipping ignored directories and
/// the workspace config file.
fn saved_paths(root: &Path, event: &Event) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| !is_ignored(root, p) && p.is_file())
        .cloned()
        .collect()
}

fn is_ignored(root: &Path, path: &Path) -> bool {
    // Rewritten by the auto-review toggle, and may hold an API key.
    if path == Config::repo_config_path(root) {
        return true;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .any(|c| IGNORED_DIRS.iter().any(|dir| c.as_os_str() == *dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    #[test]
    fn ignores_vcs_and_build_dirs() {
        let root = Path::new("/repo");
        assert!(is_ignored(root, Path::new("/repo/.git/index")));
        assert!(is_ignored(root, Path::new("/repo/target/debug/app")));
        assert!(!is_ignored(root, Path::new("/repo/src/main.rs")));
        assert!(!is_ignored(root, Path::new("/repo/src/target.rs")));
        assert!(is_ignored(root, Path::new("/repo/.quibble.toml")));
        assert!(!is_ignored(root, Path::new("/repo/docs/.quibble.toml")));
    }

    #[test]
    fn file_args_resolve_against_current_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let sub = root.join("src");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("foo.rs"), "").unwrap();

        let resolved = resolve_file_args(&sub, &[PathBuf::from("foo.rs")]);
        assert_eq!(resolved, vec![sub.join("foo.rs")]);

        let resolved = resolve_file_args(&sub, &[PathBuf::from("../src/foo.rs")]);
        assert_eq!(resolved, vec![sub.join("foo.rs")]);

        // Absolute arguments pass through; missing files are kept as given.
        let absolute = root.join("gone.rs");
        assert_eq!(resolve_file_args(&sub, &[absolute.clone()]), vec![absolute]);
    }

    #[test]
    fn saved_paths_keeps_written_files_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "fn main() {}\n").unwrap();
        let git_dir = dir.path().join(".git");
        std::fs::create_dir(&git_dir).unwrap();
        let index = git_dir.join("index");
        std::fs::write(&index, "").unwrap();
        RepoSettings::new(dir.path()).set_auto_review(true).unwrap();
        let settings_file = dir.path().join(constants::CONFIG_FILENAME);
        assert!(settings_file.is_file());

        let modified = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(file.clone())
            .add_path(index);
        assert_eq!(saved_paths(dir.path(), &modified), vec![file.clone()]);

        let settings_write = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(settings_file);
        assert!(saved_paths(dir.path(), &settings_write).is_empty());

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(file.clone());
        assert_eq!(saved_paths(dir.path(), &created), vec![file.clone()]);

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(file);
        assert!(saved_paths(dir.path(), &removed).is_empty());
    }
}

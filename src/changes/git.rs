//! Git CLI backend for the change tracker.
//!
//! Shells out to `git` via `tokio::process::Command`.

use std::path::Path;

use async_trait::async_trait;

use super::status::{WorkingTreeStatus, parse_porcelain};
use super::{ChangeError, VersionControl};

/// [`VersionControl`] implementation backed by the `git` binary on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }
}

/// Run `git <args>` in `root`, returning stdout on success.
async fn run_git(root: &Path, args: &[&str]) -> Result<String, ChangeError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .await
        .map_err(|e| ChangeError::VcsUnavailable(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ChangeError::Git(format!(
            "git {} failed (exit {}): {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| ChangeError::Git(format!("git output is not valid UTF-8: {e}")))
}

#[async_trait]
impl VersionControl for GitCli {
    async fn is_repository(&self, root: &Path) -> Result<bool, ChangeError> {
        match run_git(root, &["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(ChangeError::Git(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn status(&self, root: &Path) -> Result<WorkingTreeStatus, ChangeError> {
        let out = run_git(
            root,
            &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
        )
        .await?;
        Ok(parse_porcelain(&out))
    }

    async fn show_head(&self, root: &Path, path: &str) -> Result<String, ChangeError> {
        run_git(root, &["show", &format!("HEAD:{path}")]).await
    }

    async fn diff_head(&self, root: &Path, paths: &[&str]) -> Result<String, ChangeError> {
        let mut args = vec![
            "diff",
            "-M",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            "HEAD",
            "--",
        ];
        args.extend_from_slice(paths);
        run_git(root, &args).await
    }
}

/// Find the root of the git repository containing `start_dir`.
pub async fn find_repo_root(start_dir: &Path) -> Result<String, ChangeError> {
    let out = run_git(start_dir, &["rev-parse", "--show-toplevel"])
        .await
        .map_err(|e| match e {
            ChangeError::Git(msg) => ChangeError::NotARepository(msg),
            other => other,
        })?;
    Ok(out.trim().to_string())
}
